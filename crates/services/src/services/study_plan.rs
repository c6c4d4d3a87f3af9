//! Multi-week study plans.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use super::{
    generation::{
        GenerationError, lenient_items, lenient_list, lenient_number, required, text_or_lines,
    },
    llm_client::{CompletionRequest, Llm},
};

pub const DEFAULT_WEEKS: u32 = 4;
pub const MAX_WEEKS: u32 = 12;

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanRequest {
    pub goal: Option<String>,
    pub experience_level: Option<String>,
    pub hours_per_week: Option<f64>,
    pub weeks: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyWeek {
    #[serde(deserialize_with = "week_number")]
    pub week: u32,
    #[serde(deserialize_with = "text_or_lines")]
    pub focus: String,
    #[serde(deserialize_with = "lenient_list")]
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyPlan {
    #[serde(deserialize_with = "text_or_lines")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_items")]
    pub weeks: Vec<StudyWeek>,
}

/// Weeks are renumbered after parsing, so any unreadable value becomes zero.
fn week_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|n| *n >= 0.0)
        .map_or(0, |n| n as u32))
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanResponse {
    #[serde(flatten)]
    pub plan: StudyPlan,
    pub fallback: bool,
}

fn week_count(weeks: Option<u32>) -> u32 {
    weeks.unwrap_or(DEFAULT_WEEKS).clamp(1, MAX_WEEKS)
}

/// Renumber weeks 1..=n and drop empty entries.
fn normalize(mut plan: StudyPlan, limit: u32) -> StudyPlan {
    plan.summary = plan.summary.trim().to_string();
    plan.weeks = plan
        .weeks
        .into_iter()
        .filter(|w| !w.focus.trim().is_empty() || !w.tasks.is_empty())
        .take(limit as usize)
        .zip(1..)
        .map(|(mut week, n)| {
            week.week = n;
            week.focus = week.focus.trim().to_string();
            week
        })
        .collect();
    plan
}

const FALLBACK_FOCUS: [(&str, [&str; 3]); 4] = [
    (
        "Market structure",
        [
            "Mark swing highs and lows on three pairs daily",
            "Label trend, range and transition phases",
            "Write down the higher-timeframe bias before each session",
        ],
    ),
    (
        "Entries and confirmation",
        [
            "Choose one entry model and write its rules",
            "Screenshot ten historical setups that match the rules",
            "Practise entries on a demo account",
        ],
    ),
    (
        "Risk management",
        [
            "Fix a maximum risk per trade",
            "Calculate position size before every demo trade",
            "Review stop placement on last week's trades",
        ],
    ),
    (
        "Review and journaling",
        [
            "Journal every trade with screenshots",
            "Tag mistakes by category",
            "Summarise the week's lessons in three bullet points",
        ],
    ),
];

/// Plan served when the model's answer is unusable. Depends only on the inputs.
pub fn fallback_plan(goal: &str, weeks: u32) -> StudyPlan {
    let weeks = week_count(Some(weeks));
    StudyPlan {
        summary: format!(
            "A {weeks}-week foundation plan towards: {goal}. Each week builds one core skill."
        ),
        weeks: (0..weeks)
            .map(|i| {
                let (focus, tasks) = FALLBACK_FOCUS[i as usize % FALLBACK_FOCUS.len()];
                StudyWeek {
                    week: i + 1,
                    focus: focus.to_string(),
                    tasks: tasks.iter().map(|t| t.to_string()).collect(),
                }
            })
            .collect(),
    }
}

const SYSTEM_PROMPT: &str = "You are a trading mentor designing structured, realistic study plans. \
     Output valid JSON only.";

pub async fn generate_study_plan(
    llm: &Llm,
    request: &StudyPlanRequest,
) -> Result<StudyPlanResponse, GenerationError> {
    let goal = required(request.goal.as_deref(), "goal")?;
    let weeks = week_count(request.weeks);
    let level = request
        .experience_level
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("beginner");

    let mut prompt = format!(
        "Create a {weeks}-week study plan for a {level} trader.\n\n## Goal\n{goal}\n"
    );
    if let Some(hours) = request.hours_per_week.filter(|h| h.is_finite() && *h > 0.0) {
        prompt.push_str(&format!("\nAvailable time: {hours} hours per week.\n"));
    }
    prompt.push_str(&format!(
        r#"
## Output Format
Return ONLY valid JSON with exactly {weeks} weeks:
```json
{{
  "summary": "One paragraph overview",
  "weeks": [
    {{ "week": 1, "focus": "Theme of the week", "tasks": ["Task 1", "Task 2"] }}
  ]
}}
```"#
    ));

    let fallback = || {
        Ok(StudyPlanResponse {
            plan: fallback_plan(goal, weeks),
            fallback: true,
        })
    };

    match llm
        .ask_json::<StudyPlan>(CompletionRequest::prompt(SYSTEM_PROMPT, prompt))
        .await
    {
        Ok(plan) => {
            let plan = normalize(plan, weeks);
            if plan.weeks.is_empty() {
                warn!(goal = %goal, "Study plan had no weeks; serving fallback");
                return fallback();
            }
            info!(goal = %goal, weeks = plan.weeks.len(), "Generated study plan");
            Ok(StudyPlanResponse {
                plan,
                fallback: false,
            })
        }
        Err(e) => match GenerationError::from(e) {
            err if err.is_invalid_json() => {
                warn!(goal = %goal, error = %err, "Study plan was not valid JSON; serving fallback");
                fallback()
            }
            err => Err(err),
        },
    }
}
