use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub session_secret: String,
    pub session_issuer: String,
    pub session_audience: String,
    pub session_expiry_minutes: i64,
    pub session_cookie_secure: bool,
    pub cors_allowed_origin: Option<String>,
    pub oidc_authority: String,
    pub oidc_client_id: String,
    pub oidc_client_secret: String,
    pub oidc_redirect_url: String,
    pub oidc_scopes: String,
    pub oidc_profile_url: String,
    pub oidc_post_logout_redirect_url: String,
    pub directory_base_url: String,
    pub directory_scope: String,
    pub directory_timeout_secs: u64,
    pub single_entry_per_owner: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let session_secret = env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?;
        let session_issuer =
            env::var("SESSION_ISSUER").unwrap_or_else(|_| "employee-dialogue".to_string());
        let session_audience = env::var("SESSION_AUDIENCE")
            .unwrap_or_else(|_| "employee-dialogue-clients".to_string());
        let session_expiry_minutes = env::var("SESSION_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "480".to_string())
            .parse()
            .context("SESSION_EXPIRY_MINUTES must be an integer")?;
        let session_cookie_secure = env_flag("SESSION_COOKIE_SECURE", false);
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let oidc_authority = env::var("OIDC_AUTHORITY")
            .unwrap_or_else(|_| "https://login.microsoftonline.com/common".to_string());
        let oidc_client_id = env::var("OIDC_CLIENT_ID").context("OIDC_CLIENT_ID must be set")?;
        let oidc_client_secret = env::var("OIDC_CLIENT_SECRET").unwrap_or_default();
        let oidc_redirect_url = env::var("OIDC_REDIRECT_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/auth/redirect".to_string());
        let oidc_scopes = env::var("OIDC_SCOPES")
            .unwrap_or_else(|_| "openid profile email User.Read".to_string());
        let oidc_profile_url = env::var("OIDC_PROFILE_URL")
            .unwrap_or_else(|_| "https://graph.microsoft.com/v1.0/me".to_string());
        let oidc_post_logout_redirect_url = env::var("OIDC_POST_LOGOUT_REDIRECT_URL")
            .unwrap_or_else(|_| "http://localhost:3000/".to_string());
        let directory_base_url = env::var("DIRECTORY_BASE_URL")
            .unwrap_or_else(|_| "https://graph.microsoft.com/v1.0".to_string());
        let directory_scope = env::var("DIRECTORY_SCOPE")
            .unwrap_or_else(|_| "https://graph.microsoft.com/.default".to_string());
        let directory_timeout_secs = env::var("DIRECTORY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("DIRECTORY_TIMEOUT_SECS must be an integer")?;
        let single_entry_per_owner = env_flag("SINGLE_ENTRY_PER_OWNER", true);

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            session_secret,
            session_issuer,
            session_audience,
            session_expiry_minutes,
            session_cookie_secure,
            cors_allowed_origin,
            oidc_authority,
            oidc_client_id,
            oidc_client_secret,
            oidc_redirect_url,
            oidc_scopes,
            oidc_profile_url,
            oidc_post_logout_redirect_url,
            directory_base_url,
            directory_scope,
            directory_timeout_secs,
            single_entry_per_owner,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs.max(1))
    }

    pub fn directory_enabled(&self) -> bool {
        !self.oidc_client_secret.is_empty()
    }

    pub fn oidc_authorize_endpoint(&self) -> Result<Url> {
        authority_endpoint(&self.oidc_authority, "authorize")
    }

    pub fn oidc_token_endpoint(&self) -> Result<Url> {
        authority_endpoint(&self.oidc_authority, "token")
    }

    pub fn oidc_logout_endpoint(&self) -> Result<Url> {
        authority_endpoint(&self.oidc_authority, "logout")
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn authority_endpoint(authority: &str, action: &str) -> Result<Url> {
    let mut url = Url::parse(authority).context("OIDC_AUTHORITY must be a valid URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("OIDC_AUTHORITY cannot be a base URL"))?
        .pop_if_empty()
        .extend(["oauth2", "v2.0", action]);
    Ok(url)
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("*****"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
