use axum::{Json, Router, extract::State, routing::post};
use services::services::chart_analyzer::{ChartAnalysisRequest, ChartAnalysisResult, analyze_charts};

use crate::{AppState, error::ApiError, extract::AppJson};

/// POST /api/chart-analysis
/// Vision analysis of uploaded screenshots. Nothing is stored; the client saves
/// the result through `/api/analyze-charts`.
pub async fn analyze(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChartAnalysisRequest>,
) -> Result<Json<ChartAnalysisResult>, ApiError> {
    let result = analyze_charts(&state.llm, &payload)
        .await
        .map_err(ApiError::generating("chart analysis"))?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/chart-analysis", post(analyze))
}
