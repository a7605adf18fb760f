use async_session::async_trait;
use axum_login::{AuthUser, AuthnBackend, UserId};
use oauth2::{
    AuthorizationCode, CsrfToken, HttpClientError, Scope, TokenResponse,
    basic::BasicRequestTokenError,
};
use reqwest::Url;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter,
    prelude::{DateTime, Uuid},
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    directory::users::new_auth_hash,
    entities::{sea_orm_active_enums::Role, user},
    router::OauthClient,
};

impl AuthUser for user::Model {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.auth_hash.as_bytes()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub code: String,
    pub old_state: CsrfToken,
    pub new_state: CsrfToken,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error("Provider did not return a verified email")]
    MissingEmail,

    #[error(transparent)]
    Reqwest(reqwest::Error),

    #[error(transparent)]
    OAuth2(BasicRequestTokenError<HttpClientError<reqwest::Error>>),
}

/// The subset of an OpenID Connect userinfo response we rely on.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: DatabaseConnection,
    client: OauthClient,
    http: reqwest::Client,
    userinfo_url: String,
    admin_emails: Vec<String>,
}

impl Backend {
    pub fn new(
        db: DatabaseConnection,
        client: OauthClient,
        userinfo_url: String,
        admin_emails: Vec<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            db,
            client,
            http,
            userinfo_url,
            admin_emails,
        })
    }

    pub fn authorize_url(&self) -> (Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .url()
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, BackendError> {
        self.http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(BackendError::Reqwest)?
            .json::<UserInfo>()
            .await
            .map_err(BackendError::Reqwest)
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = user::Model;
    type Credentials = Credentials;
    type Error = BackendError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        // Ensure the CSRF state has not been tampered with.
        if creds.old_state.secret() != creds.new_state.secret() {
            return Ok(None);
        };

        let token_res = self
            .client
            .exchange_code(AuthorizationCode::new(creds.code))
            .request_async(&self.http)
            .await
            .map_err(Self::Error::OAuth2)?;

        let info = self.user_info(token_res.access_token().secret()).await?;
        if info.email_verified == Some(false) {
            return Err(Self::Error::MissingEmail);
        }
        let email = info.email.ok_or(Self::Error::MissingEmail)?;

        let user = upsert_user(
            &self.db,
            &email,
            info.name.as_deref(),
            &self.admin_emails,
            chrono::Utc::now().naive_utc(),
        )
        .await
        .map_err(Self::Error::Seaorm)?;

        Ok(Some(user))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        user::Entity::find_by_id(*user_id)
            .one(&self.db)
            .await
            .map_err(Self::Error::Seaorm)
    }
}

// We use a type alias for convenience.
//
// Note that we've supplied our concrete backend here.
pub type AuthSession = axum_login::AuthSession<Backend>;

/// Finds the account for `email`, creating it on first login. Addresses in
/// `admin_emails` are made (and kept) ADMIN.
pub async fn upsert_user(
    db: &DatabaseConnection,
    email: &str,
    name: Option<&str>,
    admin_emails: &[String],
    now: DateTime,
) -> Result<user::Model, sea_orm::DbErr> {
    let email = email.trim().to_lowercase();
    let is_admin = admin_emails.iter().any(|a| a.eq_ignore_ascii_case(&email));

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;

    match existing {
        Some(user) if is_admin && user.role != Role::Admin => {
            info!(user = %user.id, "promoting configured admin");
            let mut active = user.into_active_model();
            active.role = Set(Role::Admin);
            active.church_id = Set(None);
            active.auth_hash = Set(new_auth_hash());
            active.update(db).await
        }
        Some(user) => Ok(user),
        None => {
            let role = if is_admin { Role::Admin } else { Role::User };
            let name = name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or(&email))
                .to_string();
            debug!(%email, ?role, "creating user on first login");
            user::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(name),
                email: Set(email.clone()),
                role: Set(role),
                church_id: Set(None),
                auth_hash: Set(new_auth_hash()),
                created_at: Set(now),
            }
            .insert(db)
            .await
        }
    }
}
