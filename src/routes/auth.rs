use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::Redirect,
    Json,
};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::{AuthenticatedUser, SESSION_COOKIE_NAME},
    directory::resolve_manager_name,
    error::{AppError, AppResult},
    identity::Identity,
    state::AppState,
};

const STATE_COOKIE_NAME: &str = "oauth_state";
const STATE_COOKIE_MAX_AGE_SECS: i64 = 600;

#[derive(Deserialize)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn login(State(state): State<AppState>) -> AppResult<(HeaderMap, Redirect)> {
    let login_state = generate_state();
    let url = state.identity_provider.authorize_url(&login_state)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        build_cookie(
            &state,
            STATE_COOKIE_NAME,
            &login_state,
            STATE_COOKIE_MAX_AGE_SECS,
        )?,
    );

    Ok((headers, Redirect::to(url.as_str())))
}

pub async fn redirect(
    State(state): State<AppState>,
    Query(params): Query<RedirectParams>,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!(%error, %description, "identity provider rejected the login");
        return Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            format!("login failed: {error}"),
        ));
    }

    let expected = jar
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(STATE_COOKIE_NAME))
        .filter(|value| !value.is_empty());
    match (expected, params.state.as_deref()) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => return Err(AppError::bad_request("login state mismatch")),
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::bad_request("authorization code missing"))?;

    let profile = state
        .identity_provider
        .exchange_code(&code)
        .await
        .map_err(|err| {
            warn!(error = %err, "authorization code exchange failed");
            AppError::unauthorized()
        })?;

    if profile.name.is_empty() {
        return Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            "identity provider did not return a display name",
        ));
    }

    let identity = Identity::new(profile.subject_id, profile.name, profile.email);
    let manager_name = resolve_manager_name(
        state.directory.as_ref(),
        &identity,
        state.config.directory_timeout(),
    )
    .await;
    let identity = identity.with_manager(manager_name);

    let access_token = state.jwt.generate_token(&identity)?;
    info!(user = %identity.name, has_manager = !identity.manager_name.is_empty(), "user logged in");

    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        build_cookie(
            &state,
            SESSION_COOKIE_NAME,
            &access_token,
            state.jwt.expiry_seconds(),
        )?,
    );
    headers.append(SET_COOKIE, build_cookie(&state, STATE_COOKIE_NAME, "", 0)?);

    Ok((
        headers,
        Json(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.jwt.expiry_seconds(),
        }),
    ))
}

/// Clears the local session and hands the browser to the provider's sign-out page.
pub async fn logout(State(state): State<AppState>) -> AppResult<(HeaderMap, Redirect)> {
    let url = state.identity_provider.logout_url()?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_cookie(&state, SESSION_COOKIE_NAME, "", 0)?);
    Ok((headers, Redirect::to(url.as_str())))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// `SameSite=Lax` so the cookie survives the top-level redirect back from the provider.
fn build_cookie(state: &AppState, name: &str, value: &str, max_age: i64) -> AppResult<HeaderValue> {
    let mut parts = vec![format!("{name}={value}")];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    parts.push(format!("Max-Age={max_age}"));
    if max_age == 0 {
        parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    }
    if state.config.session_cookie_secure {
        parts.push("Secure".into());
    }

    HeaderValue::from_str(&parts.join("; ")).map_err(AppError::internal)
}
