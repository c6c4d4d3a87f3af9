//! Entry-model generation: suggestions from form fields, drafts from YouTube
//! videos, and learning guides for an existing model.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use super::{
    generation::{
        GenerationError, lenient_list, lenient_number, lenient_text, required, text_or_lines,
    },
    llm_client::{CompletionRequest, Llm},
    youtube::{self, YoutubeClient},
};

pub const DEFAULT_RISK_PERCENT: f64 = 1.0;
pub const MAX_RISK_PERCENT: f64 = 10.0;

/// The playbook fields shared by the server DTOs and the client store.
///
/// Every field has a default so partially filled model output still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryModelDraft {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub style: String,
    #[serde(deserialize_with = "lenient_text")]
    pub timeframe: String,
    #[serde(deserialize_with = "lenient_text")]
    pub instrument: String,
    #[serde(deserialize_with = "lenient_text")]
    pub session: String,
    /// Unreadable values parse as zero and are reset by [`EntryModelDraft::normalized`].
    #[serde(alias = "risk", alias = "risk_percent", deserialize_with = "lenient_risk")]
    pub risk_percent: f64,
    #[serde(deserialize_with = "text_or_lines")]
    pub description: String,
    #[serde(deserialize_with = "text_or_lines")]
    pub rules: String,
    #[serde(deserialize_with = "lenient_list")]
    pub checklist: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub tags: Vec<String>,
}

fn lenient_risk<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.unwrap_or(0.0))
}

impl EntryModelDraft {
    /// Trim text fields and clamp the risk to a sane range.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.style,
            &mut self.timeframe,
            &mut self.instrument,
            &mut self.session,
            &mut self.description,
            &mut self.rules,
        ] {
            *field = field.trim().to_string();
        }
        self.risk_percent = if self.risk_percent.is_finite() && self.risk_percent > 0.0 {
            self.risk_percent.min(MAX_RISK_PERCENT)
        } else {
            DEFAULT_RISK_PERCENT
        };
        self
    }

    /// Human-readable summary used inside prompts.
    pub fn describe(&self) -> String {
        let mut out = format!("Name: {}\n", self.name);
        for (label, value) in [
            ("Style", &self.style),
            ("Timeframe", &self.timeframe),
            ("Instrument", &self.instrument),
            ("Session", &self.session),
            ("Description", &self.description),
            ("Rules", &self.rules),
        ] {
            if !value.trim().is_empty() {
                out.push_str(&format!("{label}: {}\n", value.trim()));
            }
        }
        out.push_str(&format!("Risk per trade: {}%\n", self.risk_percent));
        if !self.checklist.is_empty() {
            out.push_str("Checklist:\n");
            for item in &self.checklist {
                out.push_str(&format!("- {item}\n"));
            }
        }
        if !self.tags.is_empty() {
            out.push_str(&format!("Tags: {}\n", self.tags.join(", ")));
        }
        out
    }
}

/// Study guide for one entry model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelGuide {
    #[serde(deserialize_with = "text_or_lines")]
    pub overview: String,
    #[serde(deserialize_with = "lenient_list")]
    pub steps: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub key_concepts: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub common_mistakes: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub practice_tips: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ExplainModelRequest {
    pub model: Option<EntryModelDraft>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SuggestModelRequest {
    pub style: Option<String>,
    pub timeframe: Option<String>,
    pub instrument: Option<String>,
    pub session: Option<String>,
    pub risk_percent: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SuggestModelResponse {
    pub model: EntryModelDraft,
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct VideoToModelRequest {
    pub url: Option<String>,
}

/// Where a generated model came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub url: String,
    pub video_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct VideoModelResponse {
    pub model: EntryModelDraft,
    pub source: VideoSource,
}

const MODEL_OUTPUT_FORMAT: &str = r#"## Output Format
Return ONLY valid JSON with this structure:
```json
{
  "name": "Short model name",
  "style": "scalping|day trading|swing|position",
  "timeframe": "Entry timeframe, e.g. M5",
  "instrument": "Instrument or asset class",
  "session": "Trading session, e.g. London",
  "riskPercent": 1,
  "description": "One paragraph summary",
  "rules": ["Rule 1", "Rule 2"],
  "checklist": ["Check 1", "Check 2"],
  "tags": ["tag"]
}
```"#;

const BUILDER_SYSTEM_PROMPT: &str = "You are an experienced trading mentor who turns trading ideas \
     into concrete, rule-based entry models. Rules must be objective and testable. \
     Output valid JSON only.";

/// Learning guide for an entry model. Invalid JSON from the model is an error.
pub async fn explain_model(
    llm: &Llm,
    request: &ExplainModelRequest,
) -> Result<ModelGuide, GenerationError> {
    let model = request
        .model
        .as_ref()
        .ok_or_else(|| GenerationError::Validation("Missing model".to_string()))?;
    let name = required(Some(model.name.as_str()), "model name")?;

    let prompt = format!(
        r#"Write a learning guide that teaches a trader how to execute the entry model below.

## Entry model
{}
## Output Format
Return ONLY valid JSON with this structure:
```json
{{
  "overview": "What the model is and when it applies",
  "steps": ["Step-by-step execution"],
  "keyConcepts": ["Concept: short explanation"],
  "commonMistakes": ["Mistake and how to avoid it"],
  "practiceTips": ["How to practise or backtest it"]
}}
```"#,
        model.describe()
    );

    let guide: ModelGuide = llm
        .ask_json(CompletionRequest::prompt(BUILDER_SYSTEM_PROMPT, prompt))
        .await?;
    info!(model = %name, steps = guide.steps.len(), "Generated model guide");
    Ok(guide)
}

/// Draft built directly from the form when the model's answer is unusable.
pub fn fallback_suggestion(style: &str, request: &SuggestModelRequest) -> EntryModelDraft {
    let field = |v: &Option<String>, default: &str| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    let timeframe = field(&request.timeframe, "M15");
    let instrument = field(&request.instrument, "EURUSD");

    EntryModelDraft {
        name: format!("{style} {timeframe} model"),
        style: style.to_string(),
        timeframe: timeframe.clone(),
        instrument,
        session: field(&request.session, "London"),
        risk_percent: request.risk_percent.unwrap_or(DEFAULT_RISK_PERCENT),
        description: format!(
            "A {style} entry model on the {timeframe} chart. Refine the rules after backtesting."
        ),
        rules: [
            "Trade in the direction of the higher-timeframe trend",
            "Wait for price to reach a predefined key level",
            "Enter only after a confirmation candle closes",
            "Place the stop beyond the structure that invalidates the idea",
        ]
        .join("\n"),
        checklist: vec![
            "Higher-timeframe bias marked".into(),
            "Key level identified before the session".into(),
            "Confirmation candle closed".into(),
            "Risk calculated before entry".into(),
        ],
        tags: vec![style.to_lowercase()],
    }
    .normalized()
}

/// Suggest an entry model for a trading style. Invalid JSON falls back to
/// [`fallback_suggestion`].
pub async fn suggest_model(
    llm: &Llm,
    request: &SuggestModelRequest,
) -> Result<SuggestModelResponse, GenerationError> {
    let style = required(request.style.as_deref(), "style")?;

    let mut prompt = format!(
        "Suggest one entry model for a trader with the following preferences.\n\n## Preferences\nStyle: {style}\n"
    );
    for (label, value) in [
        ("Timeframe", &request.timeframe),
        ("Instrument", &request.instrument),
        ("Session", &request.session),
        ("Notes", &request.notes),
    ] {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            prompt.push_str(&format!("{label}: {v}\n"));
        }
    }
    if let Some(risk) = request.risk_percent {
        prompt.push_str(&format!("Risk per trade: {risk}%\n"));
    }
    prompt.push('\n');
    prompt.push_str(MODEL_OUTPUT_FORMAT);

    match llm
        .ask_json::<EntryModelDraft>(CompletionRequest::prompt(BUILDER_SYSTEM_PROMPT, prompt))
        .await
    {
        Ok(draft) => {
            let mut model = draft.normalized();
            if model.name.is_empty() {
                model.name = format!("{style} model");
            }
            if model.style.is_empty() {
                model.style = style.to_string();
            }
            Ok(SuggestModelResponse {
                model,
                fallback: false,
            })
        }
        Err(e) => match GenerationError::from(e) {
            err if err.is_invalid_json() => {
                warn!(style = %style, error = %err, "Suggestion was not valid JSON; serving fallback");
                Ok(SuggestModelResponse {
                    model: fallback_suggestion(style, request),
                    fallback: true,
                })
            }
            err => Err(err),
        },
    }
}

/// Turn a YouTube video into an entry-model draft. Metadata lookup failures
/// are logged and ignored; invalid JSON from the model is an error.
pub async fn video_to_model(
    llm: &Llm,
    youtube: &YoutubeClient,
    request: &VideoToModelRequest,
) -> Result<VideoModelResponse, GenerationError> {
    let url = required(request.url.as_deref(), "url")?;
    let video_id = youtube::parse_video_id(url)?;

    let metadata = match youtube.fetch_metadata(&video_id).await {
        Ok(meta) => meta,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Could not fetch video metadata");
            Default::default()
        }
    };

    let mut prompt = format!(
        "Build an entry model from the trading strategy taught in this YouTube video.\n\n## Video\nURL: {}\n",
        youtube::watch_url(&video_id)
    );
    if let Some(title) = &metadata.title {
        prompt.push_str(&format!("Title: {title}\n"));
    }
    if let Some(author) = &metadata.author {
        prompt.push_str(&format!("Channel: {author}\n"));
    }
    prompt.push_str(
        "\nIf the strategy cannot be determined exactly, infer the most likely rules from \
         the title and channel and say so in the description.\n\n",
    );
    prompt.push_str(MODEL_OUTPUT_FORMAT);

    let draft: EntryModelDraft = llm
        .ask_json(CompletionRequest::prompt(BUILDER_SYSTEM_PROMPT, prompt))
        .await?;
    let mut model = draft.normalized();
    if model.name.is_empty() {
        model.name = metadata
            .title
            .clone()
            .unwrap_or_else(|| "Untitled model".to_string());
    }
    if !model.tags.iter().any(|t| t == "youtube") {
        model.tags.push("youtube".to_string());
    }

    info!(video_id = %video_id, model = %model.name, "Generated model from video");
    Ok(VideoModelResponse {
        model,
        source: VideoSource {
            url: url.to_string(),
            video_id,
            title: metadata.title,
            author: metadata.author,
        },
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn draft_defaults_missing_fields() {
        let draft: EntryModelDraft = serde_json::from_value(json!({
            "name": "  Silver Bullet ",
            "rules": ["FVG forms", "Enter on retrace"],
            "risk": 25
        }))
        .unwrap();
        let draft = draft.normalized();
        assert_eq!(draft.name, "Silver Bullet");
        assert_eq!(draft.rules, "FVG forms\nEnter on retrace");
        assert!(draft.checklist.is_empty());
        assert!(draft.tags.is_empty());
        assert_eq!(draft.risk_percent, MAX_RISK_PERCENT);
    }

    #[test]
    fn mistyped_fields_are_defaulted() {
        let draft: EntryModelDraft = serde_json::from_value(json!({
            "name": null,
            "style": 5,
            "timeframe": ["M5"],
            "rules": ["a"],
            "riskPercent": "1%",
            "checklist": null,
            "tags": ["ict", null]
        }))
        .unwrap();
        assert_eq!(draft.name, "");
        assert_eq!(draft.style, "5");
        assert_eq!(draft.timeframe, "");
        assert_eq!(draft.rules, "a");
        assert_eq!(draft.risk_percent, 1.0);
        assert!(draft.checklist.is_empty());
        assert_eq!(draft.tags, vec!["ict"]);

        let draft: EntryModelDraft =
            serde_json::from_value(json!({ "name": "X", "risk": "lots" })).unwrap();
        assert_eq!(draft.normalized().risk_percent, DEFAULT_RISK_PERCENT);
    }

    #[test]
    fn non_positive_risk_resets_to_default() {
        let draft = EntryModelDraft {
            risk_percent: -2.0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(draft.risk_percent, DEFAULT_RISK_PERCENT);
    }

    #[test]
    fn guide_defaults_arrays() {
        let guide: ModelGuide = serde_json::from_value(json!({ "overview": "x" })).unwrap();
        assert_eq!(guide.overview, "x");
        assert!(guide.steps.is_empty());
        assert!(guide.common_mistakes.is_empty());
    }

    #[test]
    fn describe_skips_empty_fields() {
        let draft = EntryModelDraft {
            name: "Breakout".into(),
            timeframe: "M5".into(),
            risk_percent: 0.5,
            checklist: vec!["Range marked".into()],
            ..Default::default()
        };
        let text = draft.describe();
        assert!(text.contains("Timeframe: M5"));
        assert!(!text.contains("Session:"));
        assert!(text.contains("- Range marked"));
        assert!(text.contains("Risk per trade: 0.5%"));
    }

    #[test]
    fn fallback_suggestion_uses_form_fields() {
        let request = SuggestModelRequest {
            style: Some("Scalping".into()),
            timeframe: Some("M1".into()),
            instrument: None,
            session: Some("New York".into()),
            risk_percent: Some(0.5),
            notes: None,
        };
        let draft = fallback_suggestion("Scalping", &request);
        assert_eq!(draft.name, "Scalping M1 model");
        assert_eq!(draft.instrument, "EURUSD");
        assert_eq!(draft.session, "New York");
        assert_eq!(draft.risk_percent, 0.5);
        assert_eq!(draft, fallback_suggestion("Scalping", &request));
    }
}
