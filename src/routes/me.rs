use axum::extract::State;
use sea_orm::EntityTrait;
use serde::Serialize;

use super::extract::Json;
use crate::{
    auth::{
        role::{Actor, Capability, require},
        user::AuthSession,
    },
    directory::users::{ProfileInput, complete_profile as complete},
    entities::{church, prelude::Church, user},
    error::{ActionError, ActionResult, ok},
    router::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
    #[serde(flatten)]
    pub user: user::Model,
    pub church: Option<church::Model>,
    /// False until a plain user has picked their church.
    pub profile_complete: bool,
}

pub async fn me(State(state): State<AppState>, auth_session: AuthSession) -> ActionResult<Me> {
    let user = auth_session
        .user
        .clone()
        .ok_or(ActionError::Unauthenticated)?;
    let church = match user.church_id {
        Some(id) => Church::find_by_id(id).one(&state.db).await?,
        None => None,
    };

    Ok(ok(Me {
        profile_complete: church.is_some() || Actor::from(&user).is_admin(),
        user,
        church,
    }))
}

pub async fn complete_profile(
    State(state): State<AppState>,
    mut auth_session: AuthSession,
    Json(input): Json<ProfileInput>,
) -> ActionResult<user::Model> {
    let actor = require(&auth_session, Capability::CompleteProfile)?;
    let user = complete(&state.db, &actor, input).await?;

    // The role change rotated the session hash; sign in again with it.
    auth_session
        .login(&user)
        .await
        .map_err(|e| ActionError::Internal(format!("session refresh: {e}")))?;

    Ok(ok(user))
}
