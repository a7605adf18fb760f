pub use super::attendee::Entity as Attendee;
pub use super::batch::Entity as Batch;
pub use super::church::Entity as Church;
pub use super::coordinator::Entity as Coordinator;
pub use super::division::Entity as Division;
pub use super::event::Entity as Event;
pub use super::pastor::Entity as Pastor;
pub use super::registration::Entity as Registration;
pub use super::user::Entity as User;
