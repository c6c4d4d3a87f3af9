use axum::{Json, Router, extract::State, routing::post};
use services::services::model_builder::{
    ExplainModelRequest, ModelGuide, SuggestModelRequest, SuggestModelResponse, VideoModelResponse,
    VideoToModelRequest, explain_model, suggest_model, video_to_model,
};

use crate::{AppState, error::ApiError, extract::AppJson};

/// POST /api/explain-model
pub async fn explain(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ExplainModelRequest>,
) -> Result<Json<ModelGuide>, ApiError> {
    let guide = explain_model(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("model guide"))?;
    Ok(Json(guide))
}

/// POST /api/suggest-model
pub async fn suggest(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SuggestModelRequest>,
) -> Result<Json<SuggestModelResponse>, ApiError> {
    let suggestion = suggest_model(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("model suggestion"))?;
    Ok(Json(suggestion))
}

/// POST /api/video-to-model
pub async fn from_video(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VideoToModelRequest>,
) -> Result<Json<VideoModelResponse>, ApiError> {
    let model = video_to_model(&state.llm, &state.youtube, &payload)
        .await
        .map_err(ApiError::generating("model from video"))?;
    Ok(Json(model))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/explain-model", post(explain))
        .route("/suggest-model", post(suggest))
        .route("/video-to-model", post(from_video))
}
