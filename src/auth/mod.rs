pub mod jwt;
pub mod provider;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization, Cookie};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, identity::Identity, state::AppState};

pub const SESSION_COOKIE_NAME: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub subject_id: String,
    pub name: String,
    pub email: String,
    pub manager_name: String,
}

impl AuthenticatedUser {
    pub fn identity(&self) -> Identity {
        Identity::new(&self.subject_id, &self.name, &self.email).with_manager(&self.manager_name)
    }
}

impl From<Identity> for AuthenticatedUser {
    fn from(identity: Identity) -> Self {
        Self {
            subject_id: identity.subject_id,
            name: identity.name,
            email: identity.email,
            manager_name: identity.manager_name,
        }
    }
}

/// Reads the session from a bearer token, falling back to the session cookie.
#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let token = match bearer {
            Some(token) => token,
            None => TypedHeader::<Cookie>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|TypedHeader(cookies)| {
                    cookies.get(SESSION_COOKIE_NAME).map(str::to_string)
                })
                .ok_or_else(AppError::unauthorized)?,
        };

        let claims = state
            .jwt
            .verify_token(&token)
            .map_err(|_| AppError::unauthorized())?;

        Ok(claims.into_identity().into())
    }
}
