use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use db::models::chart_analysis::{ChartAnalysis, CreateChartAnalysis, HISTORY_LIMIT};
use serde::{Deserialize, Deserializer, Serialize};
use services::services::generation::{lenient_list, lenient_text};
use serde_json::Value;
use tracing::{debug, info};
use ts_rs::TS;
use utils::text::non_blank;
use uuid::Uuid;

use super::Source;
use crate::{
    AppState,
    error::ApiError,
    extract::{AppJson, AppQuery},
};

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    pub pair: Option<String>,
    pub history: Option<String>,
}

impl AnalysisQuery {
    fn wants_history(&self) -> bool {
        matches!(
            self.history.as_deref().map(str::trim),
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true")
        )
    }
}

#[derive(Debug, Serialize, TS)]
pub struct LatestAnalysisResponse {
    pub item: Option<ChartAnalysis>,
    pub source: Source,
}

#[derive(Debug, Serialize, TS)]
pub struct AnalysisHistoryResponse {
    pub items: Vec<ChartAnalysis>,
    pub source: Source,
}

/// Either shape of the GET response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisLookup {
    Latest(LatestAnalysisResponse),
    History(AnalysisHistoryResponse),
}

/// Every field except `analysis` is coerced: a value of the wrong shape is
/// stored as its default instead of failing the request.
#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveAnalysisRequest {
    #[serde(deserialize_with = "optional_text")]
    pub pair: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    #[ts(type = "Array<string> | null")]
    pub timeframes: Vec<String>,
    #[serde(deserialize_with = "optional_text")]
    pub notes: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub analysis: Option<Value>,
    #[serde(deserialize_with = "object_or_empty")]
    #[ts(type = "Record<string, unknown> | null")]
    pub candle_ends: BTreeMap<String, Value>,
    #[serde(deserialize_with = "array_or_empty")]
    #[ts(type = "Array<unknown> | null")]
    pub checklist_state: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    #[ts(type = "Array<string> | null")]
    pub chart_images: Vec<String>,
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    Ok((!text.trim().is_empty()).then_some(text))
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

fn array_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

#[derive(Debug, Serialize, TS)]
pub struct SaveAnalysisResponse {
    pub ok: bool,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub id: Option<Uuid>,
}

/// GET /api/analyze-charts?pair=X[&history=1]
pub async fn get_analysis(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AnalysisQuery>,
) -> Result<Json<AnalysisLookup>, ApiError> {
    let pair = non_blank(query.pair.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Missing pair".to_string()))?;
    let history = query.wants_history();

    let Some(pool) = state.db.pool() else {
        return Ok(Json(if history {
            AnalysisLookup::History(AnalysisHistoryResponse {
                items: Vec::new(),
                source: Source::Fallback,
            })
        } else {
            AnalysisLookup::Latest(LatestAnalysisResponse {
                item: None,
                source: Source::Fallback,
            })
        }));
    };

    let response = if history {
        let items = ChartAnalysis::find_history_by_pair(pool, pair, HISTORY_LIMIT).await?;
        debug!(pair, count = items.len(), "Loaded analysis history");
        AnalysisLookup::History(AnalysisHistoryResponse {
            items,
            source: Source::Db,
        })
    } else {
        AnalysisLookup::Latest(LatestAnalysisResponse {
            item: ChartAnalysis::find_latest_by_pair(pool, pair).await?,
            source: Source::Db,
        })
    };
    Ok(Json(response))
}

/// POST /api/analyze-charts
/// Store one analysis. Requests without a pair or analysis are accepted and ignored.
pub async fn save_analysis(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveAnalysisRequest>,
) -> Result<Json<SaveAnalysisResponse>, ApiError> {
    let (Some(pair), Some(analysis)) = (non_blank(payload.pair.as_deref()), payload.analysis)
    else {
        debug!("Analysis save without pair or analysis; nothing stored");
        return Ok(Json(SaveAnalysisResponse {
            ok: true,
            source: Source::Noop,
            id: None,
        }));
    };

    let Some(pool) = state.db.pool() else {
        return Ok(Json(SaveAnalysisResponse {
            ok: true,
            source: Source::Fallback,
            id: None,
        }));
    };

    let data = CreateChartAnalysis {
        pair: pair.to_string(),
        timeframes: payload.timeframes,
        notes: payload.notes.unwrap_or_default(),
        analysis,
        candle_ends: payload.candle_ends,
        checklist_state: payload.checklist_state,
        chart_images: payload.chart_images,
    };
    let entry = ChartAnalysis::create(pool, Uuid::new_v4(), &data).await?;

    info!(pair = %entry.pair, id = %entry.id, "Saved chart analysis");
    Ok(Json(SaveAnalysisResponse {
        ok: true,
        source: Source::Db,
        id: Some(entry.id),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/analyze-charts", get(get_analysis).post(save_analysis))
}
