//! HTTP handlers. Each one resolves the actor, calls one action and wraps the
//! result in the JSON envelope.

use sea_orm::prelude::DateTime;

pub mod admin;
pub mod api;
pub mod dashboard;
pub mod events;
pub mod extract;
pub mod me;
pub mod registrations;
pub mod review;

pub(crate) fn now() -> DateTime {
    chrono::Utc::now().naive_utc()
}
