use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;
use crate::identity::Identity;

/// Organisation directory that knows who manages whom.
#[async_trait]
pub trait DirectoryLookup: Send + Sync + 'static {
    /// `Ok(None)` means the directory has no manager on record.
    async fn fetch_manager_display_name(&self, user: &Identity) -> Result<Option<String>>;
}

/// Resolves the manager's display name without ever failing the caller.
///
/// Errors, empty answers and timeouts all collapse to an empty string.
pub async fn resolve_manager_name(
    directory: &dyn DirectoryLookup,
    user: &Identity,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, directory.fetch_manager_display_name(user)).await {
        Ok(Ok(Some(name))) => name.trim().to_string(),
        Ok(Ok(None)) => String::new(),
        Ok(Err(err)) => {
            warn!(user = %user.name, error = %err, "manager lookup failed");
            String::new()
        }
        Err(_) => {
            warn!(
                user = %user.name,
                timeout_ms = timeout.as_millis() as u64,
                "manager lookup timed out"
            );
            String::new()
        }
    }
}

/// Used when no directory credentials are configured.
pub struct NoDirectory;

#[async_trait]
impl DirectoryLookup for NoDirectory {
    async fn fetch_manager_display_name(&self, _user: &Identity) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Microsoft Graph style directory, queried with an app-only token.
pub struct GraphDirectory {
    client: Client,
    base_url: Url,
    token_endpoint: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    cached_token: Mutex<Option<CachedToken>>,
}

/// Tokens are refreshed this long before the provider says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_token_lifetime() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct AppTokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn issued(response: AppTokenResponse, now: Instant) -> Self {
        Self {
            value: response.access_token,
            expires_at: now + Duration::from_secs(response.expires_in),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryUser {
    display_name: Option<String>,
    mail: Option<String>,
    user_principal_name: Option<String>,
}

impl DirectoryUser {
    fn best_name(self) -> Option<String> {
        [self.display_name, self.mail, self.user_principal_name]
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

impl GraphDirectory {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.directory_base_url)
            .context("DIRECTORY_BASE_URL must be a valid URL")?;
        let token_endpoint = config.oidc_token_endpoint()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.directory_timeout_secs))
            .build()
            .context("failed to build directory HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token_endpoint,
            client_id: config.oidc_client_id.clone(),
            client_secret: config.oidc_client_secret.clone(),
            scope: config.directory_scope.clone(),
            cached_token: Mutex::new(None),
        })
    }

    /// App-only token, reused until shortly before it expires.
    async fn app_token(&self) -> Result<String> {
        let mut cached = self.cached_token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let response = self.request_app_token().await?;
        debug!(expires_in_secs = response.expires_in, "directory token refreshed");
        let token = CachedToken::issued(response, Instant::now());
        *cached = Some(token.clone());
        Ok(token.value)
    }

    async fn request_app_token(&self) -> Result<AppTokenResponse> {
        let response = self
            .client
            .post(self.token_endpoint.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .context("directory token request failed")?
            .error_for_status()
            .context("directory token request rejected")?;

        response
            .json()
            .await
            .context("invalid directory token response")
    }

    fn manager_url(&self, subject_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("directory base URL cannot be a base"))?
            .pop_if_empty()
            .extend(["users", subject_id, "manager"]);
        Ok(url)
    }
}

#[async_trait]
impl DirectoryLookup for GraphDirectory {
    async fn fetch_manager_display_name(&self, user: &Identity) -> Result<Option<String>> {
        if user.subject_id.is_empty() {
            return Ok(None);
        }

        let token = self.app_token().await?;
        let response = self
            .client
            .get(self.manager_url(&user.subject_id)?)
            .bearer_auth(token)
            .send()
            .await
            .context("manager lookup request failed")?;

        match response.status() {
            StatusCode::OK => {
                let manager: DirectoryUser = response
                    .json()
                    .await
                    .context("invalid manager lookup response")?;
                Ok(manager.best_name())
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(%status, body = %body, "manager lookup returned an error status");
                Ok(None)
            }
        }
    }
}
