use axum::extract::State;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use super::now;
use crate::{
    auth::{
        role::{Actor, Capability},
        user::AuthSession,
    },
    directory::events::{OpenEvent, list_open_events},
    entities::{batch, prelude::*, sea_orm_active_enums::ReviewStatus},
    error::{ActionError, ActionResult, ok},
    router::AppState,
    workflow::registration::{RegistrationView, list_registrations},
};

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub actor: Actor,
    pub open_events: Vec<OpenEvent>,
    /// The president's own registrations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrations: Option<Vec<RegistrationView>>,
    /// Batch totals across all churches, for reviewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewCounts>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ActionResult<Dashboard> {
    let user = auth_session
        .user
        .as_ref()
        .ok_or(ActionError::Unauthenticated)?;
    let actor = Actor::from(user);

    let registrations = if actor.require(Capability::SubmitRegistration).is_ok() && !actor.is_admin()
    {
        Some(list_registrations(&state.db, &actor).await?)
    } else {
        None
    };
    let review = if actor.require(Capability::ReviewBatches).is_ok() {
        Some(review_counts(&state.db).await?)
    } else {
        None
    };

    Ok(ok(Dashboard {
        open_events: list_open_events(&state.db, now()).await?,
        actor,
        registrations,
        review,
    }))
}

async fn review_counts(db: &DatabaseConnection) -> Result<ReviewCounts, ActionError> {
    let count = |status: ReviewStatus| {
        Batch::find()
            .filter(batch::Column::Status.eq(status))
            .count(db)
    };
    Ok(ReviewCounts {
        pending: count(ReviewStatus::Pending).await?,
        approved: count(ReviewStatus::Approved).await?,
        rejected: count(ReviewStatus::Rejected).await?,
    })
}
