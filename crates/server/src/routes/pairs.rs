use axum::{Json, Router, extract::State, routing::get};
use db::models::pair::Pair;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::Source;
use crate::{AppState, error::ApiError, extract::AppJson};

#[derive(Debug, Serialize, TS)]
pub struct PairsResponse {
    pub pairs: Vec<String>,
    pub source: Source,
}

#[derive(Debug, Deserialize, TS)]
pub struct SavePairsRequest {
    pub pairs: Option<Vec<String>>,
}

#[derive(Debug, Serialize, TS)]
pub struct SavePairsResponse {
    pub ok: bool,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub count: Option<usize>,
}

/// GET /api/pairs
pub async fn get_pairs(State(state): State<AppState>) -> Result<Json<PairsResponse>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(PairsResponse {
            pairs: Pair::defaults(),
            source: Source::Fallback,
        }));
    };

    Ok(Json(PairsResponse {
        pairs: Pair::find_all(pool).await?,
        source: Source::Db,
    }))
}

/// POST /api/pairs
/// Replace the whole stored list.
pub async fn save_pairs(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SavePairsRequest>,
) -> Result<Json<SavePairsResponse>, ApiError> {
    let pairs = payload
        .pairs
        .ok_or_else(|| ApiError::BadRequest("Missing pairs".to_string()))?;

    let Some(pool) = state.db.pool() else {
        return Ok(Json(SavePairsResponse {
            ok: true,
            source: Source::Fallback,
            count: None,
        }));
    };

    let saved = Pair::replace_all(pool, &pairs).await?;
    info!(count = saved.len(), "Saved pair list");
    Ok(Json(SavePairsResponse {
        ok: true,
        source: Source::Db,
        count: Some(saved.len()),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/pairs", get(get_pairs).post(save_pairs))
}
