//! YouTube link parsing and oEmbed metadata lookup.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum YoutubeError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,
    #[error("metadata lookup failed: {0}")]
    Lookup(String),
    #[error("http client error: {0}")]
    Client(String),
}

/// Title and channel as reported by the oEmbed endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: Option<String>,
    #[serde(alias = "author_name")]
    pub author: Option<String>,
}

/// Extract the 11-character video id from any of the common YouTube link shapes.
pub fn parse_video_id(input: &str) -> Result<String, YoutubeError> {
    let input = input.trim();
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&with_scheme).map_err(|_| YoutubeError::InvalidUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(YoutubeError::InvalidUrl);
    }

    let host = url.host_str().ok_or(YoutubeError::InvalidUrl)?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());
    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("shorts" | "embed" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    };

    candidate
        .filter(|id| is_video_id(id))
        .ok_or(YoutubeError::InvalidUrl)
}

fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Looks up video metadata. Constructed without an endpoint, it never makes requests.
#[derive(Debug, Clone, Default)]
pub struct YoutubeClient {
    oembed: Option<OembedEndpoint>,
}

#[derive(Debug, Clone)]
struct OembedEndpoint {
    http: Client,
    url: String,
}

impl YoutubeClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(oembed_url: Option<String>) -> Result<Self, YoutubeError> {
        let Some(url) = oembed_url else {
            return Ok(Self::disabled());
        };
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| YoutubeError::Client(e.to_string()))?;
        Ok(Self {
            oembed: Some(OembedEndpoint { http, url }),
        })
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, YoutubeError> {
        let Some(OembedEndpoint { http, url }) = &self.oembed else {
            return Ok(VideoMetadata::default());
        };

        let res = http
            .get(url)
            .query(&[("url", watch_url(video_id).as_str()), ("format", "json")])
            .send()
            .await
            .map_err(|e| YoutubeError::Lookup(e.to_string()))?;

        if !res.status().is_success() {
            return Err(YoutubeError::Lookup(format!("http {}", res.status())));
        }

        res.json::<VideoMetadata>()
            .await
            .map_err(|e| YoutubeError::Lookup(e.to_string()))
    }
}
