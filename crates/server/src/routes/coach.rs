use axum::{Json, Router, extract::State, routing::post};
use services::services::coach::{CoachReply, CoachRequest, ask_coach};

use crate::{AppState, error::ApiError, extract::AppJson};

/// POST /api/ai-coach
pub async fn coach(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CoachRequest>,
) -> Result<Json<CoachReply>, ApiError> {
    let reply = ask_coach(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("coach reply"))?;
    Ok(Json(reply))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ai-coach", post(coach))
}
