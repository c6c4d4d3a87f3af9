use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A reference video attached to a project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Uuid,
    pub project_id: Uuid,
    pub url: String,
    pub video_id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateVideo {
    pub url: String,
    pub video_id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
}

const COLUMNS: &str = "id, project_id, url, video_id, title, notes, created_at";

impl Video {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        project_id: Uuid,
        data: &CreateVideo,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO videos ({COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {COLUMNS}"#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(id)
            .bind(project_id)
            .bind(&data.url)
            .bind(&data.video_id)
            .bind(&data.title)
            .bind(&data.notes)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {COLUMNS}
               FROM videos
               WHERE project_id = $1
               ORDER BY created_at DESC, rowid DESC"#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::{
            model_profile::{CreateModelProfile, ModelProfile},
            project::{CreateProject, Project},
        },
    };

    async fn project(pool: &SqlitePool) -> Project {
        Project::create(
            pool,
            Uuid::new_v4(),
            &CreateProject {
                name: "ICT concepts".into(),
                description: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn children_are_listed_per_project() {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool().unwrap();
        let first = project(pool).await;
        let second = project(pool).await;

        Video::create(
            pool,
            Uuid::new_v4(),
            first.id,
            &CreateVideo {
                url: "https://youtu.be/dQw4w9WgXcQ".into(),
                video_id: "dQw4w9WgXcQ".into(),
                title: Some("Silver bullet".into()),
                notes: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(Video::find_by_project_id(pool, first.id).await.unwrap().len(), 1);
        assert!(Video::find_by_project_id(pool, second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_project_violates_foreign_key() {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool().unwrap();

        let result = ModelProfile::create(
            pool,
            Uuid::new_v4(),
            Uuid::new_v4(),
            &CreateModelProfile {
                name: "Orphan".into(),
                ..Default::default()
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn deleting_project_cascades() {
        let db = DBService::new_in_memory().await.unwrap();
        let pool = db.pool().unwrap();
        let project = project(pool).await;

        let model = ModelProfile::create(
            pool,
            Uuid::new_v4(),
            project.id,
            &CreateModelProfile {
                name: "London breakout".into(),
                checklist: vec!["Asian range marked".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(model.checklist.0, vec!["Asian range marked"]);

        assert_eq!(Project::delete(pool, project.id).await.unwrap(), 1);
        assert!(Project::find_by_id(pool, project.id).await.unwrap().is_none());
        assert!(ModelProfile::find_by_project_id(pool, project.id)
            .await
            .unwrap()
            .is_empty());
    }
}
