use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// An entry model saved server-side under a project.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub style: Option<String>,
    pub timeframe: Option<String>,
    pub instrument: Option<String>,
    pub rules: Option<String>,
    #[ts(type = "Array<string>")]
    pub checklist: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelProfile {
    pub name: String,
    pub style: Option<String>,
    pub timeframe: Option<String>,
    pub instrument: Option<String>,
    pub rules: Option<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
}

const COLUMNS: &str = "id, project_id, name, style, timeframe, instrument, rules, checklist, created_at";

impl ModelProfile {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        project_id: Uuid,
        data: &CreateModelProfile,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO models ({COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {COLUMNS}"#
        );
        sqlx::query_as::<_, ModelProfile>(&sql)
            .bind(id)
            .bind(project_id)
            .bind(&data.name)
            .bind(&data.style)
            .bind(&data.timeframe)
            .bind(&data.instrument)
            .bind(&data.rules)
            .bind(Json(&data.checklist))
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
               FROM models
               WHERE project_id = $1
               ORDER BY created_at DESC, rowid DESC"#
        );
        sqlx::query_as::<_, ModelProfile>(&sql)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM models WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
