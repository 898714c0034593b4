use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    choices::{ChoiceCatalog, CATALOG},
    error::AppResult,
    lifecycle,
    routes::{
        final_assessments::FinalAssessmentResponse, self_assessments::SelfAssessmentResponse,
    },
    state::AppState,
};

#[derive(Serialize)]
pub struct OverviewResponse {
    pub own: Vec<SelfAssessmentResponse>,
    pub managed: Vec<SelfAssessmentResponse>,
    pub final_assessments: Vec<FinalAssessmentResponse>,
}

pub async fn overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<OverviewResponse>> {
    let mut conn = state.db()?;
    let overview = lifecycle::overview(&mut conn, Some(&user.identity()))?;

    Ok(Json(OverviewResponse {
        own: overview.own.into_iter().map(Into::into).collect(),
        managed: overview.managed.into_iter().map(Into::into).collect(),
        final_assessments: overview.finals.into_iter().map(Into::into).collect(),
    }))
}

pub async fn choices() -> Json<ChoiceCatalog> {
    Json(CATALOG)
}
