use anyhow::Context;
use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub redirect_url: RedirectUrl,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub userinfo_url: String,
    /// Lower-cased; these accounts are always ADMIN.
    pub admin_emails: Vec<String>,
    pub redis_url: Option<String>,
    pub storage_url: Option<String>,
    pub storage_bucket: String,
    pub storage_key: Option<String>,
    pub vision_api_url: Option<String>,
    pub vision_api_key: Option<String>,
    pub vision_model: String,
    pub rate_limit_per_minute: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env file is fine when the environment is set directly.
        dotenvy::dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

        let client_id = ClientId::new(required("OAUTH_CLIENT_ID")?);
        let client_secret = ClientSecret::new(required("OAUTH_CLIENT_SECRET")?);
        let redirect_url = RedirectUrl::new(required("OAUTH_REDIRECT_URI")?)
            .context("OAUTH_REDIRECT_URI is not a valid URL")?;
        let auth_url =
            AuthUrl::new(required("OAUTH_AUTH_URL")?).context("OAUTH_AUTH_URL is not a valid URL")?;
        let token_url = TokenUrl::new(required("OAUTH_TOKEN_URL")?)
            .context("OAUTH_TOKEN_URL is not a valid URL")?;
        let userinfo_url = required("OAUTH_USERINFO_URL")?;

        let admin_emails = parse_list(&env::var("ADMIN_EMAILS").unwrap_or_default());

        let rate_limit_per_minute = match optional("RATE_LIMIT_PER_MINUTE") {
            Some(value) => value
                .parse()
                .with_context(|| format!("RATE_LIMIT_PER_MINUTE must be a number, got {value:?}"))?,
            None => 10,
        };

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            client_id,
            client_secret,
            redirect_url,
            auth_url,
            token_url,
            userinfo_url,
            admin_emails,
            redis_url: optional("REDIS_URL"),
            storage_url: optional("STORAGE_URL"),
            storage_bucket: optional("STORAGE_BUCKET").unwrap_or_else(|| "uploads".into()),
            storage_key: optional("STORAGE_KEY"),
            vision_api_url: optional("VISION_API_URL"),
            vision_api_key: optional("VISION_API_KEY"),
            vision_model: optional("VISION_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            rate_limit_per_minute,
        })
    }

    /// Cookies are marked secure when the app is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.redirect_url.as_str().starts_with("https://")
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{key} is not set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_list;

    #[test]
    fn admin_emails_are_split_trimmed_and_lowercased() {
        assert_eq!(
            parse_list(" Boss@Example.org, ,ops@example.org "),
            vec!["boss@example.org".to_string(), "ops@example.org".to_string()]
        );
        assert!(parse_list("").is_empty());
    }
}
