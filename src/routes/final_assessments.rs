use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    lifecycle,
    models::FinalAssessment,
    payload::FinalAssessmentPayload,
    routes::self_assessments::to_iso,
    state::AppState,
};

/// The frozen employee content plus the manager's review.
#[derive(Serialize)]
pub struct FinalAssessmentResponse {
    pub id: Uuid,
    pub source_entry_id: Uuid,
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
    pub manager_objective_comment: String,
    pub manager_abilities_comment: String,
    pub manager_efficiency_comment: String,
    pub manager_general_comments: String,
    pub goals_next_period: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FinalAssessment> for FinalAssessmentResponse {
    fn from(value: FinalAssessment) -> Self {
        Self {
            id: value.id,
            source_entry_id: value.source_entry_id,
            owner_name: value.owner_name,
            owner_email: value.owner_email,
            manager_name: value.manager_name,
            objective_rating: value.objective_rating,
            objective_comment: value.objective_comment,
            technical_rating: value.technical_rating,
            project_rating: value.project_rating,
            methodology_rating: value.methodology_rating,
            abilities_comment: value.abilities_comment,
            efficiency_collaboration: value.efficiency_collaboration,
            efficiency_ownership: value.efficiency_ownership,
            efficiency_resourcefulness: value.efficiency_resourcefulness,
            efficiency_comment: value.efficiency_comment,
            conduct_mutual_trust: value.conduct_mutual_trust,
            conduct_proactivity: value.conduct_proactivity,
            conduct_leadership: value.conduct_leadership,
            conduct_comment: value.conduct_comment,
            general_comments: value.general_comments,
            feedback_received: value.feedback_received,
            manager_objective_comment: value.manager_objective_comment,
            manager_abilities_comment: value.manager_abilities_comment,
            manager_efficiency_comment: value.manager_efficiency_comment,
            manager_general_comments: value.manager_general_comments,
            goals_next_period: value.goals_next_period,
            created_at: to_iso(value.created_at),
            updated_at: to_iso(value.updated_at),
        }
    }
}

pub async fn get_final_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(final_id): Path<Uuid>,
) -> AppResult<Json<FinalAssessmentResponse>> {
    let mut conn = state.db()?;
    let final_entry = lifecycle::get_final_assessment(&mut conn, Some(&user.identity()), final_id)?;
    Ok(Json(final_entry.into()))
}

pub async fn update_final_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(final_id): Path<Uuid>,
    Json(payload): Json<FinalAssessmentPayload>,
) -> AppResult<Json<FinalAssessmentResponse>> {
    let mut conn = state.db()?;
    let final_entry =
        lifecycle::update_final_assessment(&mut conn, Some(&user.identity()), final_id, &payload)?;
    Ok(Json(final_entry.into()))
}

pub async fn delete_final_assessment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(final_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    lifecycle::delete_final_assessment(&mut conn, Some(&user.identity()), final_id)?;
    Ok(StatusCode::NO_CONTENT)
}
