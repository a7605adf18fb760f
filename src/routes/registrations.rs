use axum::extract::State;
use sea_orm::prelude::Uuid;

use super::{
    extract::{Json, Path},
    now,
};
use crate::{
    auth::{
        role::{Capability, require},
        user::AuthSession,
    },
    error::{ActionResult, ok},
    router::AppState,
    workflow::{
        payload::BatchPayload,
        registration::{self, BatchView, NewRegistration, RegistrationEdit, RegistrationView},
    },
};

pub async fn list(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ActionResult<Vec<RegistrationView>> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    Ok(ok(registration::list_registrations(&state.db, &actor).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<NewRegistration>,
) -> ActionResult<RegistrationView> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    Ok(ok(
        registration::create_registration(&state.db, &actor, input, now()).await?,
    ))
}

pub async fn show(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<RegistrationView> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    Ok(ok(registration::get_registration(&state.db, &actor, id).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<()> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    registration::cancel_registration(&state.db, &actor, id, now()).await?;
    Ok(ok(()))
}

pub async fn add_batch(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<BatchPayload>,
) -> ActionResult<BatchView> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    Ok(ok(
        registration::add_batch(&state.db, &actor, id, payload, now()).await?,
    ))
}

pub async fn edit_registration(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path((id, batch_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<BatchPayload>,
) -> ActionResult<RegistrationEdit> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    Ok(ok(registration::edit_registration(
        &state.db,
        &actor,
        id,
        batch_id,
        payload,
        now(),
    )
    .await?))
}

pub async fn edit_batch(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<BatchPayload>,
) -> ActionResult<BatchView> {
    let actor = require(&auth_session, Capability::SubmitRegistration)?;
    Ok(ok(
        registration::edit_batch(&state.db, &actor, id, payload, now()).await?,
    ))
}
