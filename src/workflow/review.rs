use sea_orm::{
    ActiveEnum, ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait,
    IntoActiveModel, TransactionTrait,
    prelude::{DateTime, Uuid},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    registration::refresh_registration_status,
    status::{BatchAction, transition},
};
use crate::{
    auth::role::{Actor, Capability},
    entities::{batch, prelude::*, registration},
    error::ActionError,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectInput {
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub batch: batch::Model,
    pub registration: registration::Model,
}

pub async fn approve_batch(
    db: &DatabaseConnection,
    actor: &Actor,
    batch_id: Uuid,
    now: DateTime,
) -> Result<ReviewOutcome, ActionError> {
    review(db, actor, batch_id, BatchAction::Approve, None, now).await
}

/// Rejection always carries the reviewer's remarks back to the church.
pub async fn reject_batch(
    db: &DatabaseConnection,
    actor: &Actor,
    batch_id: Uuid,
    remarks: &str,
    now: DateTime,
) -> Result<ReviewOutcome, ActionError> {
    let remarks = remarks.trim();
    if remarks.is_empty() {
        actor.require(Capability::ReviewBatches)?;
        return Err(ActionError::field(
            "remarks",
            "Remarks are required when rejecting a batch",
        ));
    }
    review(
        db,
        actor,
        batch_id,
        BatchAction::Reject,
        Some(remarks.to_string()),
        now,
    )
    .await
}

async fn review(
    db: &DatabaseConnection,
    actor: &Actor,
    batch_id: Uuid,
    action: BatchAction,
    remarks: Option<String>,
    now: DateTime,
) -> Result<ReviewOutcome, ActionError> {
    actor.require(Capability::ReviewBatches)?;

    let txn = db.begin().await?;

    let batch = Batch::find_by_id(batch_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::BatchNotFound)?;
    let next = transition(batch.status, action)?;
    let registration = Registration::find_by_id(batch.registration_id)
        .one(&txn)
        .await?
        .ok_or(ActionError::RegistrationNotFound)?;

    let mut active = batch.into_active_model();
    active.status = Set(next);
    active.reviewed_at = Set(Some(now));
    active.reviewed_by = Set(Some(actor.user_id));
    active.rejection_remarks = Set(remarks);
    let batch = active.update(&txn).await?;

    let registration = refresh_registration_status(&txn, registration, now).await?;

    txn.commit().await?;
    info!(
        batch = %batch.id,
        reviewer = %actor.user_id,
        status = %batch.status.to_value(),
        registration_status = %registration.status.to_value(),
        "batch reviewed"
    );

    Ok(ReviewOutcome {
        batch,
        registration,
    })
}
