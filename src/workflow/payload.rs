use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::sea_orm_active_enums::{Gender, PersonType};

/// One round of people submitted for review.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    #[validate(length(min = 1, message = "Add at least one delegate or cook"), nested)]
    pub attendees: Vec<AttendeeInput>,
    #[validate(url(message = "Receipt must be a valid URL"))]
    pub receipt_url: Option<String>,
    pub receipt_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeInput {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(max = 50, message = "Nickname is too long"))]
    pub nickname: Option<String>,
    #[validate(range(min = 1, max = 120, message = "Age must be between 1 and 120"))]
    pub age: i32,
    pub gender: Gender,
    pub person_type: PersonType,
}

impl BatchPayload {
    /// Trims names and drops blank nicknames before validation.
    pub fn normalized(mut self) -> Self {
        for attendee in &mut self.attendees {
            attendee.full_name = attendee.full_name.trim().to_string();
            attendee.nickname = attendee
                .nickname
                .take()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
        }
        self.receipt_url = self.receipt_url.filter(|u| !u.trim().is_empty());
        self.receipt_path = self.receipt_path.filter(|p| !p.trim().is_empty());
        self
    }
}
