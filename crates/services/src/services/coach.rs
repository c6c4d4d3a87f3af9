use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::{
    generation::{GenerationError, required},
    llm_client::{CompletionRequest, Llm},
};

/// Only the most recent turns are sent back to the model.
pub const MAX_HISTORY_TURNS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a patient trading coach. Answer questions about technical \
     analysis, trade execution, risk management and trading psychology. Be concrete and \
     concise. Never promise profits or give personalised financial advice.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CoachRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CoachReply {
    pub reply: String,
}

fn build_prompt(message: &str, request: &CoachRequest) -> String {
    let mut prompt = String::new();

    if let Some(context) = request.context.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("## Context\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    let skip = request.history.len().saturating_sub(MAX_HISTORY_TURNS);
    let turns: Vec<&ChatTurn> = request
        .history
        .iter()
        .skip(skip)
        .filter(|t| !t.content.trim().is_empty())
        .collect();
    if !turns.is_empty() {
        prompt.push_str("## Conversation so far\n");
        for turn in turns {
            let speaker = if turn.role.eq_ignore_ascii_case("assistant") {
                "Coach"
            } else {
                "Trader"
            };
            prompt.push_str(&format!("{speaker}: {}\n", turn.content.trim()));
        }
        prompt.push('\n');
    }

    prompt.push_str("## Question\n");
    prompt.push_str(message);
    prompt
}

pub async fn ask_coach(llm: &Llm, request: &CoachRequest) -> Result<CoachReply, GenerationError> {
    let message = required(request.message.as_deref(), "message")?;
    let prompt = build_prompt(message, request);

    let reply = llm
        .ask(CompletionRequest::prompt(SYSTEM_PROMPT, prompt))
        .await?;

    info!(
        history_turns = request.history.len().min(MAX_HISTORY_TURNS),
        reply_length = reply.len(),
        "Coach replied"
    );
    Ok(CoachReply {
        reply: reply.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn prompt_includes_context_and_recent_history() {
        let history = (0..15)
            .map(|i| turn(if i % 2 == 0 { "user" } else { "assistant" }, &format!("turn {i}")))
            .collect();
        let request = CoachRequest {
            message: Some("What about stops?".into()),
            history,
            context: Some("Trading EURUSD on M15".into()),
        };
        let prompt = build_prompt("What about stops?", &request);

        assert!(prompt.starts_with("## Context\nTrading EURUSD on M15"));
        assert!(!prompt.contains("turn 4\n"));
        assert!(prompt.contains("Trader: turn 14"));
        assert!(prompt.contains("Coach: turn 13"));
        assert!(prompt.ends_with("## Question\nWhat about stops?"));
    }

    #[test]
    fn bare_message_has_no_sections() {
        let request = CoachRequest::default();
        assert_eq!(build_prompt("hi", &request), "## Question\nhi");
    }
}
