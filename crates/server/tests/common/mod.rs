#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum_test::TestServer;
use db::DBService;
use server::{AppState, routes};
use services::services::{
    llm_client::{CompletionRequest, LanguageModel, Llm, LlmError},
    youtube::YoutubeClient,
};
use utils::config::{AppConfig, DeploymentInfo};

/// Replays queued replies in order and records every request it sees.
#[derive(Default)]
pub struct StubModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubModel {
    pub fn reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn fail(&self, err: LlmError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::MissingApiKey))
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub llm: Arc<StubModel>,
    pub db: DBService,
}

fn config(persistence_enabled: bool) -> AppConfig {
    AppConfig {
        persistence_enabled,
        youtube_oembed_url: None,
        deployment: DeploymentInfo {
            commit: Some("abc123".into()),
            environment: Some("test".into()),
            ..Default::default()
        },
        ..AppConfig::default()
    }
}

async fn build(db: DBService) -> TestApp {
    let llm = Arc::new(StubModel::default());
    let state = AppState::new(
        config(db.persistence_enabled()),
        db.clone(),
        Llm::from_arc(llm.clone()),
        YoutubeClient::disabled(),
    );
    let server = TestServer::new(routes::router(state)).unwrap();
    TestApp { server, llm, db }
}

/// App backed by a fresh in-memory database.
pub async fn app_with_db() -> TestApp {
    build(DBService::new_in_memory().await.unwrap()).await
}

/// App running in fallback mode.
pub async fn app_without_db() -> TestApp {
    build(DBService::disabled()).await
}
