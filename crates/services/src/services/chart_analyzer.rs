//! Vision analysis of uploaded chart screenshots.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};
use tracing::info;
use ts_rs::TS;

use super::{
    generation::{GenerationError, lenient_list, lenient_number, required, text_or_lines},
    llm_client::{CompletionRequest, ContentPart, Llm, Message},
};

pub const MAX_IMAGES: usize = 6;
const MAX_OUTPUT_TOKENS: u32 = 2048;
const SUPPORTED_MEDIA_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChartAnalysisRequest {
    pub pair: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub timeframes: Vec<String>,
    pub notes: Option<String>,
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Bias {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

fn lenient_bias<'de, D>(deserializer: D) -> Result<Bias, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default())
}

fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map_or(0.0, |s| s.clamp(0.0, 10.0)))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartAnalysisResult {
    #[serde(deserialize_with = "lenient_bias")]
    pub bias: Bias,
    /// Setup quality on a 0 to 10 scale.
    #[serde(deserialize_with = "lenient_score")]
    pub quality_score: f64,
    #[serde(deserialize_with = "text_or_lines")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_list")]
    pub key_levels: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub checklist: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub risks: Vec<String>,
}

/// A decoded upload, ready to attach to the model request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub media_type: String,
    pub data: String,
}

/// Media type of raw base64 image data, read from the encoded file signature.
fn sniff_media_type(data: &str) -> Option<&'static str> {
    const SIGNATURES: [(&str, &str); 4] = [
        ("iVBOR", "image/png"),
        ("/9j/", "image/jpeg"),
        ("R0lGOD", "image/gif"),
        ("UklGR", "image/webp"),
    ];
    SIGNATURES
        .iter()
        .find(|(prefix, _)| data.starts_with(prefix))
        .map(|(_, media_type)| *media_type)
}

/// Accept `data:image/png;base64,...` URLs or raw base64. Raw data is typed
/// from its file signature, defaulting to PNG.
pub fn parse_image(input: &str) -> Result<ChartImage, GenerationError> {
    let input = input.trim();
    let (media_type, data) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| GenerationError::Validation("Invalid image data".to_string()))?;
            let media_type = header
                .strip_suffix(";base64")
                .ok_or_else(|| GenerationError::Validation("Images must be base64 encoded".to_string()))?;
            (media_type.to_ascii_lowercase(), data)
        }
        None => (sniff_media_type(input).unwrap_or("image/png").to_string(), input),
    };

    if !SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(GenerationError::Validation(format!(
            "Unsupported image type: {media_type}"
        )));
    }
    let data: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if data.is_empty() || STANDARD.decode(&data).is_err() {
        return Err(GenerationError::Validation("Invalid image data".to_string()));
    }

    Ok(ChartImage { media_type, data })
}

const SYSTEM_PROMPT: &str = "You are a professional technical analyst reviewing chart screenshots \
     for a trading student. Base every statement on what is visible in the charts. \
     Output valid JSON only.";

pub async fn analyze_charts(
    llm: &Llm,
    request: &ChartAnalysisRequest,
) -> Result<ChartAnalysisResult, GenerationError> {
    let pair = required(request.pair.as_deref(), "pair")?;
    if request.images.is_empty() {
        return Err(GenerationError::Validation("Missing images".to_string()));
    }
    if request.images.len() > MAX_IMAGES {
        return Err(GenerationError::Validation(format!(
            "Too many images (max {MAX_IMAGES})"
        )));
    }
    let images = request
        .images
        .iter()
        .map(|i| parse_image(i))
        .collect::<Result<Vec<_>, _>>()?;

    let mut text = format!("Analyze the attached chart screenshots for {pair}.\n");
    let timeframes: Vec<&str> = request
        .timeframes
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !timeframes.is_empty() {
        text.push_str(&format!("Timeframes, in image order: {}\n", timeframes.join(", ")));
    }
    if let Some(notes) = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        text.push_str(&format!("Trader notes: {notes}\n"));
    }
    text.push_str(
        r#"
## Output Format
Return ONLY valid JSON with this structure:
```json
{
  "bias": "bullish|bearish|neutral",
  "qualityScore": 7,
  "summary": "Two or three sentences",
  "keyLevels": ["1.0850 support"],
  "checklist": ["Item to confirm before entry"],
  "risks": ["What would invalidate the idea"]
}
```"#,
    );

    let mut parts: Vec<ContentPart> = images
        .into_iter()
        .map(|i| ContentPart::image(i.media_type, i.data))
        .collect();
    parts.push(ContentPart::Text { text });

    let completion = CompletionRequest {
        system: Some(SYSTEM_PROMPT.to_string()),
        messages: vec![Message::user_parts(parts)],
        max_tokens: Some(MAX_OUTPUT_TOKENS),
    };
    let result: ChartAnalysisResult = llm.ask_json(completion).await?;

    info!(
        pair = %pair,
        image_count = request.images.len(),
        bias = %result.bias,
        quality_score = result.quality_score,
        "Analyzed charts"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_data_urls_and_raw_base64() {
        let image = parse_image("data:image/JPEG;base64,aGVsbG8=").unwrap();
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.data, "aGVsbG8=");

        let image = parse_image("aGVs\nbG8=").unwrap();
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.data, "aGVsbG8=");
    }

    #[test]
    fn raw_base64_is_typed_by_signature() {
        let cases = [
            ("iVBORw0KGgo=", "image/png"),
            ("/9j/4AAQSkZJRg==", "image/jpeg"),
            ("R0lGODlhAQABAA==", "image/gif"),
            ("UklGRiQAAABXRUJQ", "image/webp"),
        ];
        for (data, media_type) in cases {
            assert_eq!(parse_image(data).unwrap().media_type, media_type, "{data}");
        }
        // An explicit data URL header wins over the signature.
        let image = parse_image("data:image/webp;base64,/9j/4AAQSkZJRg==").unwrap();
        assert_eq!(image.media_type, "image/webp");
    }

    #[test]
    fn rejects_bad_images() {
        assert!(parse_image("").is_err());
        assert!(parse_image("not base64!").is_err());
        assert!(parse_image("data:image/png,aGVsbG8=").is_err());
        assert!(parse_image("data:application/pdf;base64,aGVsbG8=").is_err());
        assert!(parse_image("data:image/png;base64").is_err());
    }

    #[test]
    fn result_is_coerced() {
        let result: ChartAnalysisResult = serde_json::from_value(json!({
            "bias": "BULLISH",
            "qualityScore": "14",
            "keyLevels": ["1.0850"],
        }))
        .unwrap();
        assert_eq!(result.bias, Bias::Bullish);
        assert_eq!(result.quality_score, 10.0);
        assert!(result.checklist.is_empty());
        assert!(result.risks.is_empty());

        let result: ChartAnalysisResult =
            serde_json::from_value(json!({ "bias": "sideways", "qualityScore": -3 })).unwrap();
        assert_eq!(result.bias, Bias::Neutral);
        assert_eq!(result.quality_score, 0.0);
    }
}
