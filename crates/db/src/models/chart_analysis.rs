use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// Upper bound on rows returned by a history query.
pub const HISTORY_LIMIT: i64 = 50;

/// A saved "Analyze Charts" submission. Rows are append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChartAnalysis {
    pub id: Uuid,
    pub pair: String,
    #[ts(type = "Array<string>")]
    pub timeframes: Json<Vec<String>>,
    pub notes: String,
    #[ts(type = "unknown")]
    pub analysis: Json<Value>,
    /// Timeframe label -> timestamp of the last candle visible on that chart.
    #[ts(type = "Record<string, unknown>")]
    pub candle_ends: Json<BTreeMap<String, Value>>,
    #[ts(type = "Array<unknown>")]
    pub checklist_state: Json<Vec<Value>>,
    #[ts(type = "Array<string>")]
    pub chart_images: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateChartAnalysis {
    pub pair: String,
    pub timeframes: Vec<String>,
    pub notes: String,
    pub analysis: Value,
    pub candle_ends: BTreeMap<String, Value>,
    pub checklist_state: Vec<Value>,
    pub chart_images: Vec<String>,
}

const COLUMNS: &str =
    "id, pair, timeframes, notes, analysis, candle_ends, checklist_state, chart_images, created_at";

impl ChartAnalysis {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateChartAnalysis,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO chart_analyses ({COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {COLUMNS}"#
        );
        sqlx::query_as::<_, ChartAnalysis>(&sql)
            .bind(id)
            .bind(&data.pair)
            .bind(Json(&data.timeframes))
            .bind(&data.notes)
            .bind(Json(&data.analysis))
            .bind(Json(&data.candle_ends))
            .bind(Json(&data.checklist_state))
            .bind(Json(&data.chart_images))
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Most recent entry for a pair.
    pub async fn find_latest_by_pair(
        pool: &SqlitePool,
        pair: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        Ok(Self::find_history_by_pair(pool, pair, 1).await?.into_iter().next())
    }

    /// Newest-first entries for a pair, capped at [`HISTORY_LIMIT`].
    pub async fn find_history_by_pair(
        pool: &SqlitePool,
        pair: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let limit = limit.clamp(1, HISTORY_LIMIT);
        let sql = format!(
            r#"SELECT {COLUMNS}
               FROM chart_analyses
               WHERE pair = $1
               ORDER BY created_at DESC, rowid DESC
               LIMIT $2"#
        );
        sqlx::query_as::<_, ChartAnalysis>(&sql)
            .bind(pair)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_pair(pool: &SqlitePool, pair: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chart_analyses WHERE pair = $1")
            .bind(pair)
            .fetch_one(pool)
            .await
    }
}
