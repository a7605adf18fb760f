//! Outbound HTTP integrations: object storage for receipts and banners, and
//! the vision model that reads attendee lists from photos.

pub mod extraction;
pub mod storage;
