//! Directory maintenance for administrators, mounted under `/admin`.

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
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
    directory::{churches, divisions, events, users},
    entities::{church, coordinator, division, event, pastor, user},
    error::{ActionResult, ok},
    router::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/divisions", get(list_divisions).post(create_division))
        .route(
            "/divisions/{id}",
            put(rename_division).delete(delete_division),
        )
        .route("/divisions/{id}/coordinator", post(assign_coordinator))
        .route(
            "/coordinators/{id}",
            put(update_coordinator).delete(remove_coordinator),
        )
        .route("/churches", get(list_churches).post(create_church))
        .route("/churches/{id}", put(update_church).delete(delete_church))
        .route("/churches/{id}/pastor", post(assign_pastor))
        .route("/pastors/{id}", put(update_pastor).delete(remove_pastor))
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", put(update_event).delete(delete_event))
        .route("/events/{id}/status", put(set_event_status))
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(set_role))
}

async fn list_divisions(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ActionResult<Vec<divisions::DivisionSummary>> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(divisions::list_divisions(&state.db, &actor).await?))
}

async fn create_division(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<divisions::DivisionInput>,
) -> ActionResult<division::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(divisions::create_division(&state.db, &actor, input).await?))
}

async fn rename_division(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<divisions::DivisionInput>,
) -> ActionResult<division::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(divisions::rename_division(&state.db, &actor, id, input).await?))
}

async fn delete_division(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<()> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    divisions::delete_division(&state.db, &actor, id).await?;
    Ok(ok(()))
}

async fn assign_coordinator(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<divisions::CoordinatorInput>,
) -> ActionResult<coordinator::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(divisions::assign_coordinator(&state.db, &actor, id, input).await?))
}

async fn update_coordinator(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<divisions::CoordinatorInput>,
) -> ActionResult<coordinator::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(divisions::update_coordinator(&state.db, &actor, id, input).await?))
}

async fn remove_coordinator(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<()> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    divisions::remove_coordinator(&state.db, &actor, id).await?;
    Ok(ok(()))
}

async fn list_churches(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(filter): Query<churches::ChurchFilter>,
) -> ActionResult<Vec<churches::ChurchSummary>> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(churches::list_churches(&state.db, &actor, &filter).await?))
}

async fn create_church(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<churches::ChurchInput>,
) -> ActionResult<church::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(churches::create_church(&state.db, &actor, input).await?))
}

async fn update_church(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<churches::ChurchInput>,
) -> ActionResult<church::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(churches::update_church(&state.db, &actor, id, input).await?))
}

async fn delete_church(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<()> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    churches::delete_church(&state.db, &actor, id).await?;
    Ok(ok(()))
}

async fn assign_pastor(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<churches::PastorInput>,
) -> ActionResult<pastor::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(churches::assign_pastor(&state.db, &actor, id, input).await?))
}

async fn update_pastor(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<churches::PastorInput>,
) -> ActionResult<pastor::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(churches::update_pastor(&state.db, &actor, id, input).await?))
}

async fn remove_pastor(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<()> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    churches::remove_pastor(&state.db, &actor, id).await?;
    Ok(ok(()))
}

async fn list_events(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ActionResult<Vec<event::Model>> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(events::list_events(&state.db, &actor).await?))
}

async fn create_event(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<events::EventInput>,
) -> ActionResult<event::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(events::create_event(&state.db, &actor, input, now()).await?))
}

async fn update_event(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<events::EventInput>,
) -> ActionResult<event::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(events::update_event(&state.db, &actor, id, input).await?))
}

async fn delete_event(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> ActionResult<()> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    events::delete_event(&state.db, &actor, id).await?;
    Ok(ok(()))
}

async fn set_event_status(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<events::EventStatusInput>,
) -> ActionResult<event::Model> {
    let actor = require(&auth_session, Capability::ManageDirectory)?;
    Ok(ok(
        events::set_event_status(&state.db, &actor, id, input.status).await?,
    ))
}

async fn list_users(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(filter): Query<users::UserFilter>,
) -> ActionResult<Vec<users::UserSummary>> {
    let actor = require(&auth_session, Capability::ManageUsers)?;
    Ok(ok(users::list_users(&state.db, &actor, &filter).await?))
}

async fn set_role(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(input): Json<users::RoleInput>,
) -> ActionResult<user::Model> {
    let actor = require(&auth_session, Capability::ManageUsers)?;
    Ok(ok(users::set_role(&state.db, &actor, id, input).await?))
}
