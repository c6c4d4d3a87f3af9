use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use db::models::{
    model_profile::{CreateModelProfile, ModelProfile},
    project::{CreateProject, Project},
    video::{CreateVideo, Video},
};
use serde::Deserialize;
use services::services::youtube;
use sqlx::SqlitePool;
use tracing::{info, warn};
use ts_rs::TS;
use utils::text::non_blank;
use uuid::Uuid;

use super::{ListResponse, WriteResponse};
use crate::{
    AppState,
    error::ApiError,
    extract::{AppJson, AppPath},
};

#[derive(Debug, Default, Deserialize, TS)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct ModelProfileRequest {
    pub name: Option<String>,
    pub style: Option<String>,
    pub timeframe: Option<String>,
    pub instrument: Option<String>,
    pub rules: Option<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct VideoRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(str::to_string)
}

async fn ensure_project(pool: &SqlitePool, id: Uuid) -> Result<(), ApiError> {
    match Project::find_by_id(pool, id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("Project not found".to_string())),
    }
}

fn deleted(rows: u64, what: &str) -> Result<Json<WriteResponse<()>>, ApiError> {
    if rows == 0 {
        return Err(ApiError::NotFound(format!("{what} not found")));
    }
    Ok(Json(WriteResponse::db(None)))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Project>>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(ListResponse::fallback()));
    };
    Ok(Json(ListResponse::db(Project::find_all(pool).await?)))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProjectRequest>,
) -> Result<Json<WriteResponse<Project>>, ApiError> {
    let name = trimmed(payload.name).ok_or_else(|| ApiError::BadRequest("Missing name".into()))?;
    let Some(pool) = state.db.pool() else {
        return Ok(Json(WriteResponse::fallback()));
    };

    let data = CreateProject {
        name,
        description: trimmed(payload.description),
    };
    let project = Project::create(pool, Uuid::new_v4(), &data).await?;
    info!(project_id = %project.id, name = %project.name, "Created project");
    Ok(Json(WriteResponse::db(Some(project))))
}

/// DELETE /api/projects/{id}
/// Models and videos of the project go with it.
pub async fn delete_project(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<WriteResponse<()>>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(WriteResponse::fallback()));
    };
    let rows = Project::delete(pool, id).await?;
    info!(project_id = %id, rows, "Deleted project");
    deleted(rows, "Project")
}

/// GET /api/projects/{id}/models
pub async fn list_models(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<Uuid>,
) -> Result<Json<ListResponse<ModelProfile>>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(ListResponse::fallback()));
    };
    ensure_project(pool, project_id).await?;
    Ok(Json(ListResponse::db(
        ModelProfile::find_by_project_id(pool, project_id).await?,
    )))
}

/// POST /api/projects/{id}/models
pub async fn create_model(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(payload): AppJson<ModelProfileRequest>,
) -> Result<Json<WriteResponse<ModelProfile>>, ApiError> {
    let name = trimmed(payload.name).ok_or_else(|| ApiError::BadRequest("Missing name".into()))?;
    let Some(pool) = state.db.pool() else {
        return Ok(Json(WriteResponse::fallback()));
    };
    ensure_project(pool, project_id).await?;

    let data = CreateModelProfile {
        name,
        style: trimmed(payload.style),
        timeframe: trimmed(payload.timeframe),
        instrument: trimmed(payload.instrument),
        rules: trimmed(payload.rules),
        checklist: utils::text::dedupe_trimmed(payload.checklist.iter()),
    };
    let model = ModelProfile::create(pool, Uuid::new_v4(), project_id, &data).await?;
    info!(project_id = %project_id, model_id = %model.id, "Created model profile");
    Ok(Json(WriteResponse::db(Some(model))))
}

/// DELETE /api/models/{id}
pub async fn delete_model(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<WriteResponse<()>>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(WriteResponse::fallback()));
    };
    deleted(ModelProfile::delete(pool, id).await?, "Model")
}

/// GET /api/projects/{id}/videos
pub async fn list_videos(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<Uuid>,
) -> Result<Json<ListResponse<Video>>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(ListResponse::fallback()));
    };
    ensure_project(pool, project_id).await?;
    Ok(Json(ListResponse::db(
        Video::find_by_project_id(pool, project_id).await?,
    )))
}

/// POST /api/projects/{id}/videos
/// The link must be a YouTube URL. A missing title is looked up via oEmbed.
pub async fn create_video(
    State(state): State<AppState>,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(payload): AppJson<VideoRequest>,
) -> Result<Json<WriteResponse<Video>>, ApiError> {
    let url = trimmed(payload.url).ok_or_else(|| ApiError::BadRequest("Missing url".into()))?;
    let video_id =
        youtube::parse_video_id(&url).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let Some(pool) = state.db.pool() else {
        return Ok(Json(WriteResponse::fallback()));
    };
    ensure_project(pool, project_id).await?;

    let title = match trimmed(payload.title) {
        Some(title) => Some(title),
        None => match state.youtube.fetch_metadata(&video_id).await {
            Ok(meta) => meta.title,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Could not fetch video metadata");
                None
            }
        },
    };

    let data = CreateVideo {
        url,
        video_id,
        title,
        notes: trimmed(payload.notes),
    };
    let video = Video::create(pool, Uuid::new_v4(), project_id, &data).await?;
    info!(project_id = %project_id, video_id = %video.video_id, "Added video");
    Ok(Json(WriteResponse::db(Some(video))))
}

/// DELETE /api/videos/{id}
pub async fn delete_video(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<WriteResponse<()>>, ApiError> {
    let Some(pool) = state.db.pool() else {
        return Ok(Json(WriteResponse::fallback()));
    };
    deleted(Video::delete(pool, id).await?, "Video")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", delete(delete_project))
        .route("/projects/{id}/models", get(list_models).post(create_model))
        .route("/models/{id}", delete(delete_model))
        .route("/projects/{id}/videos", get(list_videos).post(create_video))
        .route("/videos/{id}", delete(delete_video))
}
