use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use serde_json::{Value, json};
use services::services::database_validator::{DatabaseReport, DatabaseValidator};
use ts_rs::TS;
use utils::config::DeploymentInfo;

use super::Source;
use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    #[serde(flatten)]
    pub deployment: DeploymentInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbTestResponse {
    pub ok: bool,
    pub configured: bool,
    pub source: Source,
    #[serde(flatten)]
    pub report: Option<DatabaseReport>,
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// GET /api/version
pub async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        deployment: state.config.deployment.clone(),
    })
}

/// GET /api/db-test
/// Probe the database and check the schema.
pub async fn db_test(State(state): State<AppState>) -> Result<Json<DbTestResponse>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(DbTestResponse {
            ok: false,
            configured: false,
            source: Source::Fallback,
            report: None,
        }));
    };

    let report = DatabaseValidator::new(pool).report().await?;
    Ok(Json(DbTestResponse {
        ok: report.is_ok(),
        configured: true,
        source: Source::Db,
        report: Some(report),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/db-test", get(db_test))
}
