//! Quiz generation: free-topic quizzes and quizzes about a specific entry model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{info, warn};
use ts_rs::TS;

use super::{
    generation::{
        GenerationError, lenient_items, lenient_list, lenient_number, lenient_text, required,
        text_or_lines,
    },
    llm_client::{CompletionRequest, Llm, LlmError},
    model_builder::EntryModelDraft,
};

pub const DEFAULT_QUESTION_COUNT: u32 = 5;
pub const MAX_QUESTION_COUNT: u32 = 20;

/// The three accepted quiz categories.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QuizCategory {
    #[default]
    Concepts,
    Execution,
    Risk,
}

impl QuizCategory {
    pub const ALL: [QuizCategory; 3] = [Self::Concepts, Self::Execution, Self::Risk];

    /// Whitelist an arbitrary label, falling back to [`QuizCategory::Concepts`].
    pub fn coerce(label: Option<&str>) -> Self {
        label
            .and_then(|l| QuizCategory::from_str(l.trim()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    pub explanation: String,
    pub category: QuizCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
    /// True when the questions are the canned set rather than model output.
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    pub topic: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ModelQuizRequest {
    pub model: Option<EntryModelDraft>,
    pub count: Option<u32>,
}

/// Shape the model is asked to produce; every field optional so partial answers survive.
#[derive(Debug, Default, Deserialize)]
struct RawQuiz {
    #[serde(default, deserialize_with = "lenient_items")]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawQuestion {
    #[serde(deserialize_with = "lenient_text")]
    question: String,
    #[serde(deserialize_with = "lenient_list")]
    options: Vec<String>,
    #[serde(
        alias = "answer",
        alias = "correctIndex",
        alias = "correct_index",
        alias = "answer_index",
        deserialize_with = "lenient_number"
    )]
    answer_index: Option<f64>,
    #[serde(deserialize_with = "text_or_lines")]
    explanation: String,
    #[serde(deserialize_with = "lenient_text")]
    category: String,
}

/// Whole, non-negative indices only.
fn option_index(value: Option<f64>) -> Option<usize> {
    value
        .filter(|v| *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as usize)
}

/// Drop malformed questions and whitelist categories.
fn normalize(raw: RawQuiz, limit: usize) -> Vec<QuizQuestion> {
    raw.questions
        .into_iter()
        .filter_map(|q| {
            let question = q.question.trim().to_string();
            let options = q.options;
            let answer_index = option_index(q.answer_index)?;
            if question.is_empty() || options.len() < 2 || answer_index >= options.len() {
                return None;
            }
            Some(QuizQuestion {
                question,
                options,
                answer_index,
                explanation: q.explanation.trim().to_string(),
                category: QuizCategory::coerce(Some(q.category.as_str())),
            })
        })
        .take(limit)
        .collect()
}

fn question_count(count: Option<u32>) -> u32 {
    count
        .unwrap_or(DEFAULT_QUESTION_COUNT)
        .clamp(1, MAX_QUESTION_COUNT)
}

fn output_format(count: u32) -> String {
    format!(
        r#"## Output Format
Return ONLY valid JSON with exactly {count} questions:
```json
{{
  "questions": [
    {{
      "question": "Question text",
      "options": ["A", "B", "C", "D"],
      "answerIndex": 0,
      "explanation": "Why the answer is correct",
      "category": "concepts|execution|risk"
    }}
  ]
}}
```"#
    )
}

const SYSTEM_PROMPT: &str = "You are a trading educator writing multiple-choice questions for \
     retail traders. Questions must be unambiguous, with exactly one correct option. \
     Output valid JSON only.";

/// The canned quiz served when the model's answer cannot be parsed.
pub fn fallback_quiz(topic: &str, category: Option<QuizCategory>) -> Vec<QuizQuestion> {
    vec![
        QuizQuestion {
            question: format!("Before entering a trade based on {topic}, what should you define first?"),
            options: vec![
                "Your invalidation level and position size".into(),
                "Your profit target only".into(),
                "How many trades you will take today".into(),
                "Nothing, the setup speaks for itself".into(),
            ],
            answer_index: 0,
            explanation: "Knowing where the idea is wrong and how much you risk comes before everything else.".into(),
            category: category.unwrap_or(QuizCategory::Risk),
        },
        QuizQuestion {
            question: "What is the main purpose of a pre-trade checklist?".into(),
            options: vec![
                "To guarantee a winning trade".into(),
                "To apply the same criteria consistently on every setup".into(),
                "To increase the number of trades taken".into(),
                "To replace a stop loss".into(),
            ],
            answer_index: 1,
            explanation: "A checklist enforces consistency; it does not guarantee outcomes.".into(),
            category: category.unwrap_or(QuizCategory::Execution),
        },
    ]
}

/// Free-topic quiz. A response that is not valid JSON, or holds no usable
/// questions, is replaced by [`fallback_quiz`].
pub async fn generate_quiz(
    llm: &Llm,
    request: &GenerateQuizRequest,
) -> Result<QuizResponse, GenerationError> {
    let topic = required(request.topic.as_deref(), "topic")?;
    let category = match request.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(label) => Some(QuizCategory::from_str(label).map_err(|_| {
            GenerationError::Validation(format!(
                "Invalid category: must be one of {}",
                QuizCategory::ALL.map(|c| c.to_string()).join(", ")
            ))
        })?),
        None => None,
    };
    let difficulty = request
        .difficulty
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("intermediate");
    let count = question_count(request.count);

    let mut prompt = format!(
        "Write a {difficulty} level multiple-choice quiz about the following trading topic.\n\n## Topic\n{topic}\n"
    );
    if let Some(category) = category {
        prompt.push_str(&format!(
            "\nAll questions must belong to the \"{category}\" category.\n"
        ));
    }
    prompt.push('\n');
    prompt.push_str(&output_format(count));

    let request = CompletionRequest::prompt(SYSTEM_PROMPT, prompt);
    match llm.ask_json::<RawQuiz>(request).await {
        Ok(raw) => {
            let questions = normalize(raw, count as usize);
            if questions.is_empty() {
                warn!(topic = %topic, "Model produced no usable quiz questions; serving fallback");
                return Ok(QuizResponse {
                    questions: fallback_quiz(topic, category),
                    fallback: true,
                });
            }
            info!(topic = %topic, question_count = questions.len(), "Generated quiz");
            Ok(QuizResponse {
                questions,
                fallback: false,
            })
        }
        Err(e) => match GenerationError::from(e) {
            err if err.is_invalid_json() => {
                warn!(topic = %topic, error = %err, "Quiz response was not valid JSON; serving fallback");
                Ok(QuizResponse {
                    questions: fallback_quiz(topic, category),
                    fallback: true,
                })
            }
            err => Err(err),
        },
    }
}

/// Quiz about one entry model. Unusable model output is an error here.
pub async fn quiz_model(
    llm: &Llm,
    request: &ModelQuizRequest,
) -> Result<QuizResponse, GenerationError> {
    let model = request
        .model
        .as_ref()
        .ok_or_else(|| GenerationError::Validation("Missing model".to_string()))?;
    let name = required(Some(model.name.as_str()), "model name")?;
    let count = question_count(request.count);

    let prompt = format!(
        "Write a multiple-choice quiz that tests whether a trader has memorised and understood \
         the entry model below. Cover its rules, checklist and risk management.\n\n\
         ## Entry model\n{}\n\n{}",
        model.describe(),
        output_format(count)
    );

    let raw: RawQuiz = llm
        .ask_json(CompletionRequest::prompt(SYSTEM_PROMPT, prompt))
        .await?;
    let questions = normalize(raw, count as usize);
    if questions.is_empty() {
        return Err(GenerationError::InvalidJson(LlmError::InvalidJson(
            "no usable questions".to_string(),
        )));
    }

    info!(model = %name, question_count = questions.len(), "Generated model quiz");
    Ok(QuizResponse {
        questions,
        fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: serde_json::Value) -> RawQuiz {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn category_whitelist() {
        assert_eq!(QuizCategory::coerce(Some("Risk")), QuizCategory::Risk);
        assert_eq!(QuizCategory::coerce(Some("execution")), QuizCategory::Execution);
        assert_eq!(QuizCategory::coerce(Some("psychology")), QuizCategory::Concepts);
        assert_eq!(QuizCategory::coerce(None), QuizCategory::Concepts);
        assert_eq!(QuizCategory::Risk.to_string(), "risk");
    }

    #[test]
    fn normalize_drops_broken_questions() {
        let quiz = raw(json!({
            "questions": [
                { "question": "Good?", "options": ["yes", "no"], "answerIndex": 0, "category": "risk" },
                { "question": "One option", "options": ["only"], "answerIndex": 0 },
                { "question": "Out of range", "options": ["a", "b"], "answerIndex": 2 },
                { "question": "Negative", "options": ["a", "b"], "answerIndex": -1 },
                { "options": ["a", "b"], "answerIndex": 0 },
                { "question": "Alias", "options": ["a", " ", "b"], "answer": 1, "category": "weird" }
            ]
        }));
        let questions = normalize(quiz, 10);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].category, QuizCategory::Risk);
        assert_eq!(questions[0].explanation, "");
        assert_eq!(questions[1].options, vec!["a", "b"]);
        assert_eq!(questions[1].answer_index, 1);
        assert_eq!(questions[1].category, QuizCategory::Concepts);
    }

    #[test]
    fn one_malformed_question_does_not_sink_the_rest() {
        let quiz = raw(json!({
            "questions": [
                { "question": "Good?", "options": ["yes", "no"], "answerIndex": 0 },
                { "question": "Broken", "options": null, "answerIndex": 0 },
                null,
                { "question": "String index", "options": ["a", "b", "c"], "answerIndex": "1" },
                { "question": "Fractional", "options": ["a", "b"], "answerIndex": 0.5 },
                { "question": 7, "options": ["a", "b"], "answerIndex": 0, "explanation": null, "category": 3 }
            ]
        }));
        let questions = normalize(quiz, 10);
        assert_eq!(
            questions.iter().map(|q| q.question.as_str()).collect::<Vec<_>>(),
            vec!["Good?", "String index", "7"]
        );
        assert_eq!(questions[1].answer_index, 1);
        assert_eq!(questions[2].category, QuizCategory::Concepts);
        assert_eq!(questions[2].explanation, "");
    }

    #[test]
    fn non_array_questions_are_empty() {
        assert!(normalize(raw(json!({ "questions": null })), 5).is_empty());
        assert!(normalize(raw(json!({ "questions": "none" })), 5).is_empty());
    }

    #[test]
    fn normalize_respects_limit_and_missing_array() {
        let quiz = raw(json!({
            "questions": [
                { "question": "1", "options": ["a", "b"], "answerIndex": 0 },
                { "question": "2", "options": ["a", "b"], "answerIndex": 1 }
            ]
        }));
        assert_eq!(normalize(quiz, 1).len(), 1);
        assert!(normalize(raw(json!({})), 5).is_empty());
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_quiz("order blocks", None);
        let b = fallback_quiz("order blocks", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|q| q.answer_index < q.options.len()));
        let pinned = fallback_quiz("fvg", Some(QuizCategory::Concepts));
        assert!(pinned.iter().all(|q| q.category == QuizCategory::Concepts));
    }

    #[test]
    fn count_is_clamped() {
        assert_eq!(question_count(None), DEFAULT_QUESTION_COUNT);
        assert_eq!(question_count(Some(0)), 1);
        assert_eq!(question_count(Some(500)), MAX_QUESTION_COUNT);
    }
}
