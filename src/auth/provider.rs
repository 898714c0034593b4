use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::AppConfig;

/// Profile returned by the identity provider after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub subject_id: String,
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    fn authorize_url(&self, state: &str) -> Result<Url>;

    /// Where to send the browser to end the provider-side session.
    fn logout_url(&self) -> Result<Url>;

    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity>;
}

/// OpenID Connect authorization-code flow against a confidential client.
pub struct OidcProvider {
    client: Client,
    authorize_endpoint: Url,
    token_endpoint: Url,
    profile_endpoint: Url,
    logout_endpoint: Url,
    post_logout_redirect_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Accepts both Graph (`id`, `displayName`, `mail`) and standard OIDC
/// userinfo (`sub`, `name`, `email`) shapes.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(alias = "sub")]
    id: String,
    #[serde(rename = "displayName", alias = "name", default)]
    display_name: Option<String>,
    #[serde(alias = "email", default)]
    mail: Option<String>,
    #[serde(rename = "userPrincipalName", alias = "preferred_username", default)]
    user_principal_name: Option<String>,
}

impl ProfileResponse {
    fn into_identity(self) -> ProviderIdentity {
        let email = self
            .mail
            .filter(|value| !value.trim().is_empty())
            .or(self.user_principal_name)
            .unwrap_or_default();
        ProviderIdentity {
            subject_id: self.id,
            name: self.display_name.unwrap_or_default().trim().to_string(),
            email,
        }
    }
}

impl OidcProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build identity provider HTTP client")?;

        Ok(Self {
            client,
            authorize_endpoint: config.oidc_authorize_endpoint()?,
            token_endpoint: config.oidc_token_endpoint()?,
            profile_endpoint: Url::parse(&config.oidc_profile_url)
                .context("OIDC_PROFILE_URL must be a valid URL")?,
            logout_endpoint: config.oidc_logout_endpoint()?,
            post_logout_redirect_url: config.oidc_post_logout_redirect_url.clone(),
            client_id: config.oidc_client_id.clone(),
            client_secret: config.oidc_client_secret.clone(),
            redirect_url: config.oidc_redirect_url.clone(),
            scopes: config.oidc_scopes.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorize_url(&self, state: &str) -> Result<Url> {
        let mut url = self.authorize_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_mode", "query")
            .append_pair("scope", &self.scopes)
            .append_pair("state", state);
        Ok(url)
    }

    fn logout_url(&self) -> Result<Url> {
        let mut url = self.logout_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", &self.post_logout_redirect_url);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity> {
        if code.is_empty() {
            return Err(anyhow!("authorization code missing"));
        }

        let response = self
            .client
            .post(self.token_endpoint.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", self.scopes.as_str()),
            ])
            .send()
            .await
            .context("token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("token endpoint returned {status}: {body}"));
        }

        let token: TokenResponse = response.json().await.context("invalid token response")?;

        let profile: ProfileResponse = self
            .client
            .get(self.profile_endpoint.clone())
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("profile request failed")?
            .error_for_status()
            .context("profile request rejected")?
            .json()
            .await
            .context("invalid profile response")?;

        Ok(profile.into_identity())
    }
}
