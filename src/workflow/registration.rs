use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::{DateTime, Uuid},
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::{
    fee::{FeeSchedule, HeadCount, fee_type, sum_fees},
    payload::{AttendeeInput, BatchPayload},
    status::{BatchAction, derive_registration_status, transition},
};
use crate::{
    auth::role::{Actor, Capability},
    entities::{
        attendee, batch, event, prelude::*, registration,
        sea_orm_active_enums::{PersonType, ReviewStatus},
    },
    error::ActionError,
};

pub const REOPEN_WARNING: &str =
    "This batch had already been reviewed. Your changes were saved and it now needs re-approval.";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub church_id: Uuid,
    pub event_id: Uuid,
    pub batch: BatchPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: batch::Model,
    pub attendees: Vec<attendee::Model>,
    pub head_count: HeadCount,
    pub fee_type: &'static str,
    pub fee: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationView {
    #[serde(flatten)]
    pub registration: registration::Model,
    pub event_name: String,
    pub batches: Vec<BatchView>,
    pub total_fee: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEdit {
    pub registration: registration::Model,
    pub batch: BatchView,
    /// True when an already-reviewed batch was sent back to review.
    pub reopened: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

/// First submission of a church for an event: the registration and batch #1
/// are written together or not at all.
pub async fn create_registration(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewRegistration,
    now: DateTime,
) -> Result<RegistrationView, ActionError> {
    actor.require(Capability::SubmitRegistration)?;
    actor.require_church(input.church_id)?;
    let payload = input.batch.normalized();
    payload.validate()?;

    let txn = db.begin().await?;

    let event = find_event(&txn, input.event_id).await?;
    Church::find_by_id(input.church_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::NotFound("Church"))?;

    let existing = Registration::find()
        .filter(registration::Column::ChurchId.eq(input.church_id))
        .filter(registration::Column::EventId.eq(input.event_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(ActionError::DuplicateRegistration);
    }
    ensure_open(&event, now)?;

    let registration = registration::ActiveModel {
        id: Set(Uuid::new_v4()),
        event_id: Set(event.id),
        church_id: Set(input.church_id),
        president_id: Set(actor.user_id),
        status: Set(ReviewStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|e| ActionError::from_write(e, || ActionError::DuplicateRegistration))?;

    let (batch, attendees) = insert_batch(&txn, &registration, 1, &event, &payload, now).await?;
    let view = batch_view(batch, attendees, &event)?;

    txn.commit().await?;
    info!(
        registration = %registration.id,
        church = %registration.church_id,
        event = %event.id,
        "registration created"
    );

    let total_fee = view.fee;
    Ok(RegistrationView {
        registration,
        event_name: event.name,
        batches: vec![view],
        total_fee,
    })
}

/// Adds another round of people to an existing registration.
pub async fn add_batch(
    db: &DatabaseConnection,
    actor: &Actor,
    registration_id: Uuid,
    payload: BatchPayload,
    now: DateTime,
) -> Result<BatchView, ActionError> {
    actor.require(Capability::SubmitRegistration)?;
    let payload = payload.normalized();
    payload.validate()?;

    let txn = db.begin().await?;

    let registration = Registration::find_by_id(registration_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::RegistrationNotFound)?;
    actor.require_church(registration.church_id)?;
    let event = find_event(&txn, registration.event_id).await?;
    ensure_open(&event, now)?;

    let last_number = Batch::find()
        .select_only()
        .column_as(Expr::col(batch::Column::BatchNumber).max(), "last_number")
        .filter(batch::Column::RegistrationId.eq(registration.id))
        .into_tuple::<Option<i32>>()
        .one(&txn)
        .await?
        .flatten()
        .unwrap_or(0);

    let (batch, attendees) =
        insert_batch(&txn, &registration, last_number + 1, &event, &payload, now).await?;
    refresh_registration_status(&txn, registration, now).await?;
    let view = batch_view(batch, attendees, &event)?;

    txn.commit().await?;
    debug!(batch = %view.batch.id, number = view.batch.batch_number, "batch added");

    Ok(view)
}

/// Replaces the people on a batch that is still waiting for review.
pub async fn edit_batch(
    db: &DatabaseConnection,
    actor: &Actor,
    batch_id: Uuid,
    payload: BatchPayload,
    now: DateTime,
) -> Result<BatchView, ActionError> {
    actor.require(Capability::SubmitRegistration)?;
    let payload = payload.normalized();
    payload.validate()?;

    let txn = db.begin().await?;

    let batch = Batch::find_by_id(batch_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::BatchNotFound)?;
    let registration = Registration::find_by_id(batch.registration_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::RegistrationNotFound)?;
    actor.require_church(registration.church_id)?;
    transition(batch.status, BatchAction::Edit)?;
    let event = find_event(&txn, registration.event_id).await?;
    ensure_open(&event, now)?;

    let attendees = replace_attendees(&txn, batch.id, &payload.attendees).await?;
    let batch = if payload.receipt_url.is_some() || payload.receipt_path.is_some() {
        let mut active = batch.into_active_model();
        active.receipt_url = Set(payload.receipt_url.clone());
        active.receipt_path = Set(payload.receipt_path.clone());
        active.update(&txn).await?
    } else {
        batch
    };
    let view = batch_view(batch, attendees, &event)?;

    txn.commit().await?;
    debug!(batch = %view.batch.id, "pending batch edited");

    Ok(view)
}

/// Registration-level edit. Unlike [`edit_batch`] this accepts reviewed
/// batches, sending them back to `PENDING` so they are approved again.
pub async fn edit_registration(
    db: &DatabaseConnection,
    actor: &Actor,
    registration_id: Uuid,
    batch_id: Uuid,
    payload: BatchPayload,
    now: DateTime,
) -> Result<RegistrationEdit, ActionError> {
    actor.require(Capability::SubmitRegistration)?;
    let payload = payload.normalized();
    payload.validate()?;

    let txn = db.begin().await?;

    let registration = Registration::find_by_id(registration_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::RegistrationNotFound)?;
    actor.require_church(registration.church_id)?;
    let batch = Batch::find_by_id(batch_id)
        .one(&txn)
        .await?
        .filter(|b| b.registration_id == registration.id)
        .ok_or(ActionError::BatchNotFound)?;
    let event = find_event(&txn, registration.event_id).await?;
    ensure_open(&event, now)?;

    let reopened = batch.status != ReviewStatus::Pending;
    let attendees = replace_attendees(&txn, batch.id, &payload.attendees).await?;

    let mut active = batch.into_active_model();
    active.status = Set(ReviewStatus::Pending);
    active.reviewed_at = Set(None);
    active.reviewed_by = Set(None);
    active.rejection_remarks = Set(None);
    if payload.receipt_url.is_some() || payload.receipt_path.is_some() {
        active.receipt_url = Set(payload.receipt_url.clone());
        active.receipt_path = Set(payload.receipt_path.clone());
    }
    let batch = active.update(&txn).await?;
    let registration = refresh_registration_status(&txn, registration, now).await?;
    let view = batch_view(batch, attendees, &event)?;

    txn.commit().await?;
    if reopened {
        info!(
            batch = %view.batch.id,
            registration = %registration.id,
            "reviewed batch reopened by edit"
        );
    }

    Ok(RegistrationEdit {
        registration,
        batch: view,
        reopened,
        warning: reopened.then_some(REOPEN_WARNING),
    })
}

/// Withdraws a registration. Refused once anything has been approved.
pub async fn cancel_registration(
    db: &DatabaseConnection,
    actor: &Actor,
    registration_id: Uuid,
    now: DateTime,
) -> Result<(), ActionError> {
    actor.require(Capability::SubmitRegistration)?;

    let txn = db.begin().await?;

    let registration = Registration::find_by_id(registration_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::RegistrationNotFound)?;
    actor.require_church(registration.church_id)?;
    let event = find_event(&txn, registration.event_id).await?;
    ensure_open(&event, now)?;

    let batches = Batch::find()
        .filter(batch::Column::RegistrationId.eq(registration.id))
        .all(&txn)
        .await?;
    if batches.iter().any(|b| b.status == ReviewStatus::Approved) {
        return Err(ActionError::conflict(
            "status",
            "Registrations with approved batches cannot be cancelled",
        ));
    }

    let batch_ids: Vec<Uuid> = batches.iter().map(|b| b.id).collect();
    Attendee::delete_many()
        .filter(attendee::Column::BatchId.is_in(batch_ids))
        .exec(&txn)
        .await?;
    Batch::delete_many()
        .filter(batch::Column::RegistrationId.eq(registration.id))
        .exec(&txn)
        .await?;
    Registration::delete_by_id(registration.id).exec(&txn).await?;

    txn.commit().await?;
    info!(registration = %registration_id, "registration cancelled");
    Ok(())
}

pub async fn get_registration(
    db: &DatabaseConnection,
    actor: &Actor,
    registration_id: Uuid,
) -> Result<RegistrationView, ActionError> {
    actor.require(Capability::SubmitRegistration)?;

    let registration = Registration::find_by_id(registration_id)
        .one(db)
        .await?
        .ok_or(ActionError::RegistrationNotFound)?;
    actor.require_church(registration.church_id)?;
    let event = find_event(db, registration.event_id).await?;

    registration_view(db, registration, event).await
}

/// Registrations of the actor's church, newest first. Admins see every church.
pub async fn list_registrations(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<RegistrationView>, ActionError> {
    actor.require(Capability::SubmitRegistration)?;

    let mut query = Registration::find()
        .order_by_desc(registration::Column::CreatedAt)
        .order_by_asc(registration::Column::Id);
    if !actor.is_admin() {
        let Some(church_id) = actor.church_id else {
            return Ok(Vec::new());
        };
        query = query.filter(registration::Column::ChurchId.eq(church_id));
    }

    let registrations = query.find_also_related(Event).all(db).await?;

    let mut views = Vec::with_capacity(registrations.len());
    for (registration, event) in registrations {
        let event = event.ok_or(ActionError::NotFound("Event"))?;
        views.push(registration_view(db, registration, event).await?);
    }
    Ok(views)
}

pub(crate) async fn find_event<C: ConnectionTrait>(
    conn: &C,
    event_id: Uuid,
) -> Result<event::Model, ActionError> {
    Event::find_by_id(event_id)
        .one(conn)
        .await?
        .ok_or(ActionError::NotFound("Event"))
}

fn ensure_open(event: &event::Model, now: DateTime) -> Result<(), ActionError> {
    if event.accepts_registrations(now) {
        Ok(())
    } else {
        debug!(event = %event.id, status = ?event.status, "event not accepting registrations");
        Err(ActionError::EventNotOpen)
    }
}

async fn insert_batch<C: ConnectionTrait>(
    conn: &C,
    registration: &registration::Model,
    batch_number: i32,
    event: &event::Model,
    payload: &BatchPayload,
    now: DateTime,
) -> Result<(batch::Model, Vec<attendee::Model>), ActionError> {
    let batch = batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        registration_id: Set(registration.id),
        batch_number: Set(batch_number),
        status: Set(ReviewStatus::Pending),
        is_pre_registration: Set(event.is_pre_registration(now)),
        receipt_url: Set(payload.receipt_url.clone()),
        receipt_path: Set(payload.receipt_path.clone()),
        reviewed_at: Set(None),
        reviewed_by: Set(None),
        rejection_remarks: Set(None),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| ActionError::from_write(e, batch_number_taken))?;

    let attendees = insert_attendees(conn, batch.id, &payload.attendees).await?;
    Ok((batch, attendees))
}

pub(crate) fn batch_number_taken() -> ActionError {
    ActionError::conflict(
        "batchNumber",
        "Another batch was submitted at the same time, please try again",
    )
}

async fn insert_attendees<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
    inputs: &[AttendeeInput],
) -> Result<Vec<attendee::Model>, ActionError> {
    let models: Vec<attendee::Model> = inputs
        .iter()
        .map(|input| attendee::Model {
            id: Uuid::new_v4(),
            batch_id,
            full_name: input.full_name.clone(),
            nickname: input.nickname.clone(),
            age: input.age,
            gender: input.gender,
            person_type: input.person_type,
        })
        .collect();

    if !models.is_empty() {
        let rows = models.iter().map(|m| attendee::ActiveModel {
            id: Set(m.id),
            batch_id: Set(m.batch_id),
            full_name: Set(m.full_name.clone()),
            nickname: Set(m.nickname.clone()),
            age: Set(m.age),
            gender: Set(m.gender),
            person_type: Set(m.person_type),
        });
        Attendee::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }
    Ok(sorted_attendees(models))
}

async fn replace_attendees<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
    inputs: &[AttendeeInput],
) -> Result<Vec<attendee::Model>, ActionError> {
    Attendee::delete_many()
        .filter(attendee::Column::BatchId.eq(batch_id))
        .exec(conn)
        .await?;
    insert_attendees(conn, batch_id, inputs).await
}

/// Re-derives the registration status from its batches and stores it when it
/// changed. Must run in the same transaction as the batch write.
pub(crate) async fn refresh_registration_status<C: ConnectionTrait>(
    conn: &C,
    registration: registration::Model,
    now: DateTime,
) -> Result<registration::Model, ActionError> {
    let statuses: Vec<ReviewStatus> = Batch::find()
        .select_only()
        .column(batch::Column::Status)
        .filter(batch::Column::RegistrationId.eq(registration.id))
        .into_tuple()
        .all(conn)
        .await?;

    let derived = derive_registration_status(statuses);
    if derived == registration.status {
        return Ok(registration);
    }

    let mut active = registration.into_active_model();
    active.status = Set(derived);
    active.updated_at = Set(now);
    Ok(active.update(conn).await?)
}

async fn registration_view<C: ConnectionTrait>(
    conn: &C,
    registration: registration::Model,
    event: event::Model,
) -> Result<RegistrationView, ActionError> {
    let batches = Batch::find()
        .filter(batch::Column::RegistrationId.eq(registration.id))
        .order_by_asc(batch::Column::BatchNumber)
        .all(conn)
        .await?;
    let mut attendees = attendees_by_batch(conn, batches.iter().map(|b| b.id).collect()).await?;

    let batches: Vec<BatchView> = batches
        .into_iter()
        .map(|batch| {
            let people = attendees.remove(&batch.id).unwrap_or_default();
            batch_view(batch, people, &event)
        })
        .collect::<Result<_, _>>()?;
    let total_fee = sum_fees(batches.iter().map(|b| b.fee))?;

    Ok(RegistrationView {
        registration,
        event_name: event.name,
        batches,
        total_fee,
    })
}

pub(crate) async fn attendees_by_batch<C: ConnectionTrait>(
    conn: &C,
    batch_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<attendee::Model>>, ActionError> {
    if batch_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Attendee::find()
        .filter(attendee::Column::BatchId.is_in(batch_ids))
        .all(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<attendee::Model>> = HashMap::new();
    for row in rows {
        grouped.entry(row.batch_id).or_default().push(row);
    }
    for people in grouped.values_mut() {
        let taken = std::mem::take(people);
        *people = sorted_attendees(taken);
    }
    Ok(grouped)
}

/// Delegates, then siblings, then cooks; alphabetical within each group.
fn sorted_attendees(mut attendees: Vec<attendee::Model>) -> Vec<attendee::Model> {
    fn rank(person_type: PersonType) -> u8 {
        match person_type {
            PersonType::Delegate => 0,
            PersonType::Sibling => 1,
            PersonType::Cook => 2,
        }
    }
    attendees.sort_by(|a, b| {
        rank(a.person_type)
            .cmp(&rank(b.person_type))
            .then_with(|| a.full_name.cmp(&b.full_name))
            .then_with(|| a.id.cmp(&b.id))
    });
    attendees
}

pub(crate) fn batch_view(
    batch: batch::Model,
    attendees: Vec<attendee::Model>,
    event: &event::Model,
) -> Result<BatchView, ActionError> {
    let head_count = HeadCount::from_attendees(&attendees);
    let fee = FeeSchedule::for_event(event, batch.is_pre_registration).total(head_count)?;
    Ok(BatchView {
        fee_type: fee_type(batch.is_pre_registration),
        batch,
        attendees,
        head_count,
        fee,
    })
}
