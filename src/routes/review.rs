use axum::{extract::State, http::header, response::IntoResponse};
use sea_orm::prelude::Uuid;

use super::{
    extract::{Json, Path, Query},
    now,
};
use crate::{
    auth::{
        role::{Capability, require},
        user::AuthSession,
    },
    error::{ActionError, ActionResult, ok},
    router::AppState,
    workflow::{
        export::{export_rows, to_csv},
        queue::{QueueFilter, QueuePage, QueueQuery, review_queue},
        review::{RejectInput, ReviewOutcome, approve_batch, reject_batch},
    },
};

pub async fn queue(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(query): Query<QueueQuery>,
) -> ActionResult<QueuePage> {
    let actor = require(&auth_session, Capability::ReviewBatches)?;
    Ok(ok(review_queue(&state.db, &actor, &query).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<ReviewOutcome> {
    let actor = require(&auth_session, Capability::ReviewBatches)?;
    Ok(ok(approve_batch(&state.db, &actor, id, now()).await?))
}

pub async fn reject(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<RejectInput>,
) -> ActionResult<ReviewOutcome> {
    let actor = require(&auth_session, Capability::ReviewBatches)?;
    Ok(ok(
        reject_batch(&state.db, &actor, id, &input.remarks, now()).await?,
    ))
}

pub async fn export_csv(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(filter): Query<QueueFilter>,
) -> Result<impl IntoResponse, ActionError> {
    let actor = require(&auth_session, Capability::ExportReports)?;
    let rows = export_rows(&state.db, &actor, &filter).await?;
    let body = to_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"registrations.csv\"",
            ),
        ],
        body,
    ))
}
