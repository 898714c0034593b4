use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    directory::resolve_manager_name,
    error::{AppError, AppResult},
    lifecycle::{self, EntryState, EntryView, LifecycleError},
    models::SelfAssessment,
    payload::SelfAssessmentPayload,
    routes::final_assessments::FinalAssessmentResponse,
    state::AppState,
};

#[derive(Serialize)]
pub struct SelfAssessmentResponse {
    pub id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub manager_name: String,
    pub objective_rating: String,
    pub objective_comment: String,
    pub technical_rating: String,
    pub project_rating: String,
    pub methodology_rating: String,
    pub abilities_comment: String,
    pub efficiency_collaboration: String,
    pub efficiency_ownership: String,
    pub efficiency_resourcefulness: String,
    pub efficiency_comment: String,
    pub conduct_mutual_trust: String,
    pub conduct_proactivity: String,
    pub conduct_leadership: String,
    pub conduct_comment: String,
    pub general_comments: String,
    pub feedback_received: String,
    pub locked: bool,
    pub final_assessment_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl SelfAssessmentResponse {
    pub fn new(entry: SelfAssessment, state: EntryState) -> Self {
        Self {
            id: entry.id,
            owner_name: entry.owner_name,
            owner_email: entry.owner_email,
            manager_name: entry.manager_name,
            objective_rating: entry.objective_rating,
            objective_comment: entry.objective_comment,
            technical_rating: entry.technical_rating,
            project_rating: entry.project_rating,
            methodology_rating: entry.methodology_rating,
            abilities_comment: entry.abilities_comment,
            efficiency_collaboration: entry.efficiency_collaboration,
            efficiency_ownership: entry.efficiency_ownership,
            efficiency_resourcefulness: entry.efficiency_resourcefulness,
            efficiency_comment: entry.efficiency_comment,
            conduct_mutual_trust: entry.conduct_mutual_trust,
            conduct_proactivity: entry.conduct_proactivity,
            conduct_leadership: entry.conduct_leadership,
            conduct_comment: entry.conduct_comment,
            general_comments: entry.general_comments,
            feedback_received: entry.feedback_received,
            locked: state.is_locked(),
            final_assessment_id: state.final_assessment_id(),
            created_at: to_iso(entry.created_at),
            updated_at: to_iso(entry.updated_at),
        }
    }
}

impl From<EntryView> for SelfAssessmentResponse {
    fn from(view: EntryView) -> Self {
        Self::new(view.entry, view.state)
    }
}

pub async fn create_self_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SelfAssessmentPayload>,
) -> AppResult<(StatusCode, Json<SelfAssessmentResponse>)> {
    let identity = user.identity();

    if state.config.single_entry_per_owner {
        let mut conn = state.db()?;
        if lifecycle::owns_any_self_assessment(&mut conn, &identity.name)? {
            return Err(AppError::conflict("you already have a self assessment"));
        }
    }
    payload.validate().map_err(LifecycleError::from)?;

    // The directory lookup can take up to its timeout; no pooled connection is held across it.
    let manager_name = resolve_manager_name(
        state.directory.as_ref(),
        &identity,
        state.config.directory_timeout(),
    )
    .await;

    let mut conn = state.db()?;
    let entry =
        lifecycle::create_self_assessment(&mut conn, Some(&identity), &payload, manager_name)?;

    Ok((
        StatusCode::CREATED,
        Json(SelfAssessmentResponse::new(entry, EntryState::Editable)),
    ))
}

pub async fn get_self_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<SelfAssessmentResponse>> {
    let mut conn = state.db()?;
    let view = lifecycle::get_self_assessment(&mut conn, Some(&user.identity()), entry_id)?;
    Ok(Json(view.into()))
}

pub async fn update_self_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<SelfAssessmentPayload>,
) -> AppResult<Json<SelfAssessmentResponse>> {
    let mut conn = state.db()?;
    let entry =
        lifecycle::update_self_assessment(&mut conn, Some(&user.identity()), entry_id, &payload)?;
    Ok(Json(SelfAssessmentResponse::new(entry, EntryState::Editable)))
}

pub async fn delete_self_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    lifecycle::delete_self_assessment(&mut conn, Some(&user.identity()), entry_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn finalize_self_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entry_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<FinalAssessmentResponse>)> {
    let mut conn = state.db()?;
    let final_entry =
        lifecycle::finalize_self_assessment(&mut conn, Some(&user.identity()), entry_id)?;
    Ok((StatusCode::CREATED, Json(final_entry.into())))
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
