use axum::{Json, Router, extract::State, routing::post};
use services::services::study_plan::{StudyPlanRequest, StudyPlanResponse, generate_study_plan};

use crate::{AppState, error::ApiError, extract::AppJson};

/// POST /api/study-plan
pub async fn create_study_plan(
    State(state): State<AppState>,
    AppJson(payload): AppJson<StudyPlanRequest>,
) -> Result<Json<StudyPlanResponse>, ApiError> {
    let plan = generate_study_plan(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("study plan"))?;
    Ok(Json(plan))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/study-plan", post(create_study_plan))
}
