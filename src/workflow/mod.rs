//! Registration and review workflow: one registration per church and event,
//! accumulating batches that are reviewed one at a time.

pub mod export;
pub mod fee;
pub mod payload;
pub mod queue;
pub mod registration;
pub mod review;
pub mod status;

#[cfg(test)]
mod tests;
