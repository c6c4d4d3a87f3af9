mod common;

use common::{app_with_db, app_without_db};
use serde_json::{Value, json};

async fn create_project(app: &common::TestApp, name: &str) -> String {
    let body: Value = app
        .server
        .post("/api/projects")
        .json(&json!({ "name": name, "description": "ICT concepts" }))
        .await
        .json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["source"], "db");
    body["item"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn projects_crud() {
    let app = app_with_db().await;
    let first = create_project(&app, "Smart money").await;
    let second = create_project(&app, "Price action").await;

    let body: Value = app.server.get("/api/projects").await.json();
    assert_eq!(body["source"], "db");
    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Price action", "Smart money"]);

    let resp = app.server.delete(&format!("/api/projects/{first}")).await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.json::<Value>(), json!({ "ok": true, "source": "db" }));

    let resp = app.server.delete(&format!("/api/projects/{first}")).await;
    assert_eq!(resp.status_code(), 404);
    assert_eq!(resp.json::<Value>(), json!({ "error": "Project not found" }));

    let body: Value = app.server.get("/api/projects").await.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["id"], second);
}

#[tokio::test]
async fn project_name_is_required() {
    let app = app_with_db().await;
    let resp = app
        .server
        .post("/api/projects")
        .json(&json!({ "name": "  " }))
        .await;
    assert_eq!(resp.status_code(), 400);
    assert_eq!(resp.json::<Value>(), json!({ "error": "Missing name" }));
}

#[tokio::test]
async fn models_and_videos_belong_to_a_project() {
    let app = app_with_db().await;
    let project = create_project(&app, "Smart money").await;

    let body: Value = app
        .server
        .post(&format!("/api/projects/{project}/models"))
        .json(&json!({
            "name": "Silver bullet",
            "timeframe": "M5",
            "checklist": ["FVG", " ", "FVG", "Killzone"]
        }))
        .await
        .json();
    assert_eq!(body["item"]["projectId"], project);
    assert_eq!(body["item"]["checklist"], json!(["FVG", "Killzone"]));
    assert_eq!(body["item"]["style"], Value::Null);
    let model_id = body["item"]["id"].as_str().unwrap().to_string();

    let body: Value = app
        .server
        .post(&format!("/api/projects/{project}/videos"))
        .json(&json!({ "url": "https://youtu.be/dQw4w9WgXcQ", "notes": "watch twice" }))
        .await
        .json();
    assert_eq!(body["item"]["videoId"], "dQw4w9WgXcQ");
    assert_eq!(body["item"]["title"], Value::Null);
    let video_id = body["item"]["id"].as_str().unwrap().to_string();

    let models: Value = app
        .server
        .get(&format!("/api/projects/{project}/models"))
        .await
        .json();
    assert_eq!(models["items"].as_array().unwrap().len(), 1);
    let videos: Value = app
        .server
        .get(&format!("/api/projects/{project}/videos"))
        .await
        .json();
    assert_eq!(videos["items"][0]["notes"], "watch twice");

    let resp = app.server.delete(&format!("/api/models/{model_id}")).await;
    assert_eq!(resp.status_code(), 200);
    let resp = app.server.delete(&format!("/api/videos/{video_id}")).await;
    assert_eq!(resp.status_code(), 200);
    let resp = app.server.delete(&format!("/api/videos/{video_id}")).await;
    assert_eq!(resp.status_code(), 404);
}

#[tokio::test]
async fn deleting_a_project_cascades() {
    let app = app_with_db().await;
    let project = create_project(&app, "Cascade").await;
    app.server
        .post(&format!("/api/projects/{project}/models"))
        .json(&json!({ "name": "Model" }))
        .await;
    let body: Value = app
        .server
        .post(&format!("/api/projects/{project}/videos"))
        .json(&json!({ "url": "https://www.youtube.com/shorts/dQw4w9WgXcQ" }))
        .await
        .json();
    let video_id = body["item"]["id"].as_str().unwrap().to_string();

    app.server.delete(&format!("/api/projects/{project}")).await;

    let resp = app.server.delete(&format!("/api/videos/{video_id}")).await;
    assert_eq!(resp.status_code(), 404);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM models")
        .fetch_one(app.db.pool().unwrap())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn unknown_project_and_bad_input() {
    let app = app_with_db().await;
    let missing = "00000000-0000-4000-8000-000000000000";

    let resp = app
        .server
        .post(&format!("/api/projects/{missing}/models"))
        .json(&json!({ "name": "Orphan" }))
        .await;
    assert_eq!(resp.status_code(), 404);

    let resp = app
        .server
        .get(&format!("/api/projects/{missing}/videos"))
        .await;
    assert_eq!(resp.status_code(), 404);

    let project = create_project(&app, "Links").await;
    let resp = app
        .server
        .post(&format!("/api/projects/{project}/videos"))
        .json(&json!({ "url": "https://example.com/video" }))
        .await;
    assert_eq!(resp.status_code(), 400);
    assert_eq!(resp.json::<Value>(), json!({ "error": "Invalid YouTube URL" }));

    let resp = app
        .server
        .post(&format!("/api/projects/{project}/videos"))
        .json(&json!({}))
        .await;
    assert_eq!(resp.json::<Value>(), json!({ "error": "Missing url" }));

    let resp = app.server.delete("/api/projects/not-a-uuid").await;
    assert_eq!(resp.status_code(), 400);
    assert!(resp.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn projects_fall_back_without_database() {
    let app = app_without_db().await;
    let missing = "00000000-0000-4000-8000-000000000000";

    let body: Value = app.server.get("/api/projects").await.json();
    assert_eq!(body, json!({ "items": [], "source": "fallback" }));

    let body: Value = app
        .server
        .post("/api/projects")
        .json(&json!({ "name": "Offline" }))
        .await
        .json();
    assert_eq!(body, json!({ "ok": true, "source": "fallback" }));

    let body: Value = app
        .server
        .get(&format!("/api/projects/{missing}/models"))
        .await
        .json();
    assert_eq!(body, json!({ "items": [], "source": "fallback" }));

    let body: Value = app
        .server
        .delete(&format!("/api/videos/{missing}"))
        .await
        .json();
    assert_eq!(body, json!({ "ok": true, "source": "fallback" }));
}
