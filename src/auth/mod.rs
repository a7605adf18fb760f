pub mod role;
pub mod router;
pub mod user;
