use axum::{Router, extract::DefaultBodyLimit};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use ts_rs::TS;

use crate::AppState;

/// Room for several base64 chart screenshots in one request.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub mod analyze_charts;
pub mod chart_analysis;
pub mod coach;
pub mod health;
pub mod model_builder;
pub mod pairs;
pub mod projects;
pub mod quizzes;
pub mod study_plan;

/// Where a response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Db,
    /// Persistence is disabled; static defaults or an optimistic success.
    Fallback,
    /// The request lacked the fields needed to persist anything.
    Noop,
}

#[derive(Debug, Serialize, TS)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub source: Source,
}

impl<T> ListResponse<T> {
    pub fn db(items: Vec<T>) -> Self {
        Self {
            items,
            source: Source::Db,
        }
    }

    pub fn fallback() -> Self {
        Self {
            items: Vec::new(),
            source: Source::Fallback,
        }
    }
}

#[derive(Debug, Serialize, TS)]
pub struct WriteResponse<T> {
    pub ok: bool,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub item: Option<T>,
}

impl<T> WriteResponse<T> {
    pub fn db(item: Option<T>) -> Self {
        Self {
            ok: true,
            source: Source::Db,
            item,
        }
    }

    pub fn fallback() -> Self {
        Self {
            ok: true,
            source: Source::Fallback,
            item: None,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(pairs::router())
        .merge(analyze_charts::router())
        .merge(chart_analysis::router())
        .merge(coach::router())
        .merge(quizzes::router())
        .merge(model_builder::router())
        .merge(study_plan::router())
        .merge(projects::router());

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
