pub mod prelude;

pub mod attendee;
pub mod batch;
pub mod church;
pub mod coordinator;
pub mod division;
pub mod event;
pub mod pastor;
pub mod registration;
pub mod sea_orm_active_enums;
pub mod user;
