use axum::extract::State;

use super::now;
use crate::{
    auth::user::AuthSession,
    directory::events::{OpenEvent, list_open_events},
    error::{ActionError, ActionResult, ok},
    router::AppState,
};

/// Events a church can still register for. Any signed-in user may look.
pub async fn open_events(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ActionResult<Vec<OpenEvent>> {
    if auth_session.user.is_none() {
        return Err(ActionError::Unauthenticated);
    }
    Ok(ok(list_open_events(&state.db, now()).await?))
}
