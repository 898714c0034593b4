use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod final_assessments;
pub mod health;
pub mod overview;
pub mod self_assessments;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        warn!(origin = %value, "ignoring invalid CORS allowed origin");
                        None
                    }
                })
                .collect();

            CorsLayer::new().allow_origin(AllowOrigin::list(headers))
        }
        None => CorsLayer::new().allow_origin(AllowOrigin::mirror_request()),
    }
    .allow_methods(AllowMethods::mirror_request())
    .allow_headers(AllowHeaders::mirror_request())
    .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/login", get(auth::login))
        .route("/redirect", get(auth::redirect))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let self_assessment_routes = Router::new()
        .route("/", post(self_assessments::create_self_assessment))
        .route(
            "/:id",
            get(self_assessments::get_self_assessment)
                .put(self_assessments::update_self_assessment)
                .delete(self_assessments::delete_self_assessment),
        )
        .route(
            "/:id/finalize",
            post(self_assessments::finalize_self_assessment),
        );

    let final_assessment_routes = Router::new().route(
        "/:id",
        get(final_assessments::get_final_assessment)
            .put(final_assessments::update_final_assessment)
            .delete(final_assessments::delete_final_assessment),
    );

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .route("/api/overview", get(overview::overview))
        .nest("/api/self-assessments", self_assessment_routes)
        .nest("/api/final-assessments", final_assessment_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .route("/api/choices", get(overview::choices))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
