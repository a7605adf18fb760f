use axum::{
    Router,
    extract::Query,
    response::{Html, Redirect},
    routing::get,
};
use axum_login::tower_sessions::Session;
use oauth2::CsrfToken;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::user::{AuthSession, Credentials};
use crate::{
    entities::{sea_orm_active_enums::Role, user},
    error::ActionError,
};

/// Session key holding the CSRF state and return path between the redirect to
/// the provider and its callback.
pub const PENDING_LOGIN_KEY: &str = "auth.pending-login";

#[derive(Debug, Serialize, Deserialize)]
struct PendingLogin {
    csrf: CsrfToken,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

/// What the provider sends back: a code on success, an `error` when the
/// person declined or the provider refused.
#[derive(Debug, Deserialize)]
pub struct ProviderReply {
    code: Option<String>,
    state: Option<CsrfToken>,
    error: Option<String>,
}

pub fn router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route("/login", get(login_page).post(start_login))
        .route("/logout", get(logout))
        .route("/auth/complete", get(finish_login))
}

/// Only same-site paths are accepted as post-login targets.
fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

/// Where a fresh sign-in lands when no return path was requested. Plain users
/// still have to pick their church.
fn landing_page(user: &user::Model) -> &'static str {
    match (user.role, user.church_id) {
        (Role::User, None) => "/me",
        _ => "/dashboard",
    }
}

async fn login_page(Query(NextUrl { next }): Query<NextUrl>) -> Html<String> {
    let action = match safe_next(next) {
        Some(path) => format!("/login?next={}", utf8_percent_encode(&path, NON_ALPHANUMERIC)),
        None => "/login".to_string(),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in · Delegate Registry</title></head>
<body>
  <main>
    <h1>Delegate Registry</h1>
    <p>Church presidents and event administrators sign in with their organisation account.</p>
    <form action="{action}" method="post"><button type="submit">Continue to sign in</button></form>
  </main>
</body>
</html>"#
    ))
}

async fn start_login(
    auth_session: AuthSession,
    session: Session,
    Query(NextUrl { next }): Query<NextUrl>,
) -> Result<Redirect, ActionError> {
    let (auth_url, csrf) = auth_session.backend.authorize_url();
    let pending = PendingLogin {
        csrf,
        next: safe_next(next),
    };
    session
        .insert(PENDING_LOGIN_KEY, pending)
        .await
        .map_err(|e| ActionError::Internal(format!("store pending login: {e}")))?;

    Ok(Redirect::to(auth_url.as_str()))
}

async fn finish_login(
    mut auth_session: AuthSession,
    session: Session,
    Query(reply): Query<ProviderReply>,
) -> Result<Redirect, ActionError> {
    // Taken, not read: a callback URL cannot be replayed.
    let pending: PendingLogin = session
        .remove(PENDING_LOGIN_KEY)
        .await
        .map_err(|e| ActionError::Internal(format!("read pending login: {e}")))?
        .ok_or(ActionError::Unauthenticated)?;

    if let Some(error) = reply.error {
        warn!(%error, "provider refused sign-in");
        return Err(ActionError::Unauthenticated);
    }
    let (Some(code), Some(new_state)) = (reply.code, reply.state) else {
        return Err(ActionError::Unauthenticated);
    };

    let creds = Credentials {
        code,
        old_state: pending.csrf,
        new_state,
    };
    let user = match auth_session.authenticate(creds).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ActionError::Unauthenticated),
        Err(e) => {
            warn!(error = %e, "sign-in failed");
            return Err(ActionError::Unauthenticated);
        }
    };
    auth_session
        .login(&user)
        .await
        .map_err(|e| ActionError::Internal(format!("start session: {e}")))?;
    info!(user = %user.id, role = ?user.role, "signed in");

    let target = pending
        .next
        .unwrap_or_else(|| landing_page(&user).to_string());
    Ok(Redirect::to(&target))
}

async fn logout(mut auth_session: AuthSession) -> Result<Redirect, ActionError> {
    auth_session
        .logout()
        .await
        .map_err(|e| ActionError::Internal(format!("end session: {e}")))?;
    Ok(Redirect::to("/login"))
}
