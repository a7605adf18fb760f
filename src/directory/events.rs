use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder,
    prelude::{DateTime, Uuid},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::plural;
use crate::{
    auth::role::{Actor, Capability},
    entities::{event, prelude::*, registration, sea_orm_active_enums::EventStatus},
    error::{ActionError, FieldErrors},
    workflow::{fee::MAX_AMOUNT, registration::find_event},
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[validate(length(min = 1, max = 150, message = "Event name is required"))]
    pub name: String,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    pub location: String,
    #[validate(url(message = "Banner must be a valid URL"))]
    pub banner_url: Option<String>,
    pub banner_path: Option<String>,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub pre_registration_start: DateTime,
    pub pre_registration_end: DateTime,
    #[validate(range(min = 0, max = MAX_AMOUNT, message = "Amount is out of range"))]
    pub pre_registration_fee: i64,
    #[validate(range(min = 0, max = MAX_AMOUNT, message = "Amount is out of range"))]
    pub pre_registration_sibling_discount: i64,
    #[validate(range(min = 0, max = MAX_AMOUNT, message = "Amount is out of range"))]
    pub onsite_registration_fee: i64,
    #[validate(range(min = 0, max = MAX_AMOUNT, message = "Amount is out of range"))]
    pub onsite_sibling_discount: i64,
    #[validate(range(min = 0, max = MAX_AMOUNT, message = "Amount is out of range"))]
    pub cook_registration_fee: i64,
}

impl EventInput {
    /// Field checks plus the ones that compare fields with each other.
    pub fn check(&self) -> Result<(), ActionError> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => match ActionError::from(e) {
                ActionError::Validation(fields) => fields,
                other => return Err(other),
            },
        };
        let mut push = |field: &str, message: &str| {
            errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        };

        if self.end_date < self.start_date {
            push("endDate", "End date must not be before the start date");
        }
        if self.pre_registration_end < self.pre_registration_start {
            push("preRegistrationEnd", "Pre-registration must end after it starts");
        }
        if self.pre_registration_end > self.start_date {
            push("preRegistrationEnd", "Pre-registration must end before the event starts");
        }
        if self.pre_registration_sibling_discount > self.pre_registration_fee {
            push("preRegistrationSiblingDiscount", "Discount cannot exceed the registration fee");
        }
        if self.onsite_sibling_discount > self.onsite_registration_fee {
            push("onsiteSiblingDiscount", "Discount cannot exceed the registration fee");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ActionError::Validation(errors))
        }
    }

    fn normalized(self) -> Self {
        Self {
            name: super::clean_name(&self.name),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            location: self.location.trim().to_string(),
            banner_url: self.banner_url.filter(|u| !u.trim().is_empty()),
            banner_path: self.banner_path.filter(|p| !p.trim().is_empty()),
            ..self
        }
    }

    fn apply(self, active: &mut event::ActiveModel) {
        active.name = Set(self.name);
        active.description = Set(self.description);
        active.location = Set(self.location);
        active.banner_url = Set(self.banner_url);
        active.banner_path = Set(self.banner_path);
        active.start_date = Set(self.start_date);
        active.end_date = Set(self.end_date);
        active.pre_registration_start = Set(self.pre_registration_start);
        active.pre_registration_end = Set(self.pre_registration_end);
        active.pre_registration_fee = Set(self.pre_registration_fee);
        active.pre_registration_sibling_discount = Set(self.pre_registration_sibling_discount);
        active.onsite_registration_fee = Set(self.onsite_registration_fee);
        active.onsite_sibling_discount = Set(self.onsite_sibling_discount);
        active.cook_registration_fee = Set(self.cook_registration_fee);
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusInput {
    pub status: EventStatus,
}

/// What a president sees when choosing an event to register for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenEvent {
    #[serde(flatten)]
    pub event: event::Model,
    pub registration_deadline: DateTime,
    pub is_pre_registration: bool,
}

pub async fn list_events(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<event::Model>, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    Ok(Event::find()
        .order_by_desc(event::Column::StartDate)
        .all(db)
        .await?)
}

/// Events still taking registrations at `now`, soonest first. Open to any
/// signed-in user.
pub async fn list_open_events(
    db: &DatabaseConnection,
    now: DateTime,
) -> Result<Vec<OpenEvent>, ActionError> {
    let events = Event::find()
        .filter(event::Column::Status.is_in([EventStatus::Upcoming, EventStatus::Ongoing]))
        .filter(event::Column::StartDate.gt(now))
        .order_by_asc(event::Column::StartDate)
        .all(db)
        .await?;

    Ok(events
        .into_iter()
        .filter(|e| e.accepts_registrations(now))
        .map(|event| OpenEvent {
            registration_deadline: event.registration_deadline(),
            is_pre_registration: event.is_pre_registration(now),
            event,
        })
        .collect())
}

pub async fn create_event(
    db: &DatabaseConnection,
    actor: &Actor,
    input: EventInput,
    now: DateTime,
) -> Result<event::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let input = input.normalized();
    input.check()?;

    let mut active = event::ActiveModel {
        id: Set(Uuid::new_v4()),
        status: Set(EventStatus::Upcoming),
        created_at: Set(now),
        ..Default::default()
    };
    input.apply(&mut active);
    let event = active.insert(db).await?;

    info!(event = %event.id, name = %event.name, "event created");
    Ok(event)
}

pub async fn update_event(
    db: &DatabaseConnection,
    actor: &Actor,
    event_id: Uuid,
    input: EventInput,
) -> Result<event::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let input = input.normalized();
    input.check()?;

    let event = find_event(db, event_id).await?;
    let mut active = event.into_active_model();
    input.apply(&mut active);
    Ok(active.update(db).await?)
}

pub async fn set_event_status(
    db: &DatabaseConnection,
    actor: &Actor,
    event_id: Uuid,
    status: EventStatus,
) -> Result<event::Model, ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let event = find_event(db, event_id).await?;
    let previous = event.status;

    let mut active = event.into_active_model();
    active.status = Set(status);
    let event = active.update(db).await?;

    info!(event = %event.id, ?previous, ?status, "event status changed");
    Ok(event)
}

/// Refused while any church is registered for the event.
pub async fn delete_event(
    db: &DatabaseConnection,
    actor: &Actor,
    event_id: Uuid,
) -> Result<(), ActionError> {
    actor.require(Capability::ManageDirectory)?;
    let event = find_event(db, event_id).await?;

    let registrations = Registration::find()
        .filter(registration::Column::EventId.eq(event.id))
        .count(db)
        .await?;
    if registrations > 0 {
        return Err(ActionError::HasDependents(format!(
            "Cannot delete event \"{}\": it still has {}",
            event.name,
            plural(registrations, "registration", "registrations")
        )));
    }

    Event::delete_by_id(event.id).exec(db).await?;
    info!(event = %event_id, "event deleted");
    Ok(())
}
