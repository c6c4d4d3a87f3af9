//! Client for the hosted language model (Anthropic Messages API).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error, warn};
use utils::{config::LlmConfig, text::truncate_chars};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("missing api key: ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,
    #[error("could not decode provider response: {0}")]
    Decode(String),
    /// The model answered, but not with the JSON we asked for.
    #[error("model returned invalid JSON: {0}")]
    InvalidJson(String),
}

impl LlmError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// A base64 image attached to a user turn.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentPart {
    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource {
                kind: "base64",
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    pub role: &'static str,
    pub content: MessageContent,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Parts(parts),
        }
    }
}

/// One request to the model: an optional system prompt plus the turns.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn prompt(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            messages: vec![Message::user(prompt)],
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Concatenated text of every text part, for logging and test assertions.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            match &message.content {
                MessageContent::Text(t) => out.push_str(t),
                MessageContent::Parts(parts) => {
                    for part in parts {
                        if let ContentPart::Text { text } = part {
                            out.push_str(text);
                        }
                    }
                }
            }
        }
        out
    }
}

/// Anything that can turn a [`CompletionRequest`] into text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Shared handle the generation services use.
#[derive(Clone)]
pub struct Llm {
    inner: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for Llm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Llm").finish_non_exhaustive()
    }
}

impl Llm {
    pub fn new(model: impl LanguageModel + 'static) -> Self {
        Self {
            inner: Arc::new(model),
        }
    }

    pub fn from_arc(inner: Arc<dyn LanguageModel>) -> Self {
        Self { inner }
    }

    /// Send a request and return the model's text.
    pub async fn ask(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.inner.complete(request).await
    }

    /// Send a request expecting a JSON object in the response.
    pub async fn ask_json<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
    ) -> Result<T, LlmError> {
        let response = self.inner.complete(request).await?;
        parse_json_response(&response)
    }
}

/// Parse the JSON body out of a model reply.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T, LlmError> {
    if response.trim().is_empty() {
        error!("Model returned an empty response");
        return Err(LlmError::InvalidJson("empty response".to_string()));
    }

    let json_str = extract_json(response);
    serde_json::from_str(json_str).map_err(|e| {
        error!(
            json_error = %e,
            response_length = response.len(),
            extracted_json_preview = %truncate_chars(json_str, 500),
            "Failed to parse JSON response from model"
        );
        LlmError::InvalidJson(format!(
            "{} (response preview: {})",
            e,
            truncate_chars(json_str, 200)
        ))
    })
}

/// Request body for the Messages API
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

/// Content block in response
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn text(&self) -> Option<String> {
        let text: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();
        (!text.is_empty()).then(|| text.concat())
    }
}

/// HTTP client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    api_key: Option<Arc<SecretString>>,
    model: String,
    endpoint: String,
    max_tokens: u32,
    max_retries: usize,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("trading-coach/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config
                .api_key
                .as_ref()
                .map(|k| Arc::new(SecretString::from(k.expose_secret().to_string()))),
            model: config.model.clone(),
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            messages: &request.messages,
            system: request.system.as_deref(),
        };

        let res = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {
                let response = res
                    .json::<MessagesResponse>()
                    .await
                    .map_err(|e| LlmError::Decode(e.to_string()))?;
                if let Some(usage) = &response.usage {
                    debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
                        "Model call completed"
                    );
                }
                response
                    .text()
                    .ok_or_else(|| LlmError::Decode("no text content in response".to_string()))
            }
            StatusCode::UNAUTHORIZED => Err(LlmError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(LlmError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(LlmError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        if self.max_retries == 0 {
            return self.send_request(&request).await;
        }

        (|| async { self.send_request(&request).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(30))
                    .with_max_times(self.max_retries)
                    .with_jitter(),
            )
            .when(|e: &LlmError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Model call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }
}

fn map_reqwest_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(e.to_string())
    }
}

/// Extract JSON from a string that might contain markdown code blocks
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // Prose around a bare object: take the outermost braces.
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }

    text
}
