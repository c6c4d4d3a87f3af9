use axum::{Json, Router, extract::State, routing::post};
use services::services::quiz::{
    GenerateQuizRequest, ModelQuizRequest, QuizResponse, generate_quiz, quiz_model,
};

use crate::{AppState, error::ApiError, extract::AppJson};

/// POST /api/generate-quiz
/// Falls back to a canned quiz when the model's answer is unusable.
pub async fn create_quiz(
    State(state): State<AppState>,
    AppJson(payload): AppJson<GenerateQuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = generate_quiz(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("quiz"))?;
    Ok(Json(quiz))
}

/// POST /api/quiz-model
pub async fn create_model_quiz(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ModelQuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = quiz_model(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("model quiz"))?;
    Ok(Json(quiz))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-quiz", post(create_quiz))
        .route("/quiz-model", post(create_model_quiz))
}
