use std::sync::Arc;

use db::DBService;
use services::services::{
    llm_client::{Llm, LlmClient},
    youtube::YoutubeClient,
};
use utils::config::AppConfig;

/// Everything a handler needs. Cheap to clone; shared by all requests.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DBService,
    pub llm: Llm,
    pub youtube: YoutubeClient,
}

impl AppState {
    pub fn new(config: AppConfig, db: DBService, llm: Llm, youtube: YoutubeClient) -> Self {
        Self {
            config: Arc::new(config),
            db,
            llm,
            youtube,
        }
    }

    /// Connect to the database and build the production clients.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = DBService::from_config(&config).await?;
        let llm = Llm::new(LlmClient::new(&config.llm)?);
        let youtube = YoutubeClient::new(config.youtube_oembed_url.clone())?;
        Ok(Self::new(config, db, llm, youtube))
    }
}
