//! Question routing: history formatting and the model's tool decision.

use serde::Deserialize;
use tracing::debug;

use crate::types::{ChatRole, ChatTurn, RetrievalTool};

/// Messages of history shown to the model.
pub const HISTORY_WINDOW: usize = 6;

pub const NO_HISTORY: &str = "이전 대화 없음.";

/// Render the tail of the conversation as `사용자:`/`챗봇:` lines.
pub fn format_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                ChatRole::User => "사용자",
                ChatRole::Assistant => "챗봇",
            };
            format!("{}: {}", speaker, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tool choice plus the question rewritten with conversation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub final_query: String,
    pub tool: RetrievalTool,
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default)]
    final_query: Option<String>,
    #[serde(default)]
    tool: Option<String>,
}

impl RouteDecision {
    /// Passage search with the question as asked.
    pub fn fallback(original_query: &str) -> Self {
        Self {
            final_query: original_query.to_string(),
            tool: RetrievalTool::Vector,
        }
    }

    /// Read the model's JSON answer. Anything unreadable routes to passage
    /// search; a missing rewrite keeps the original question.
    pub fn parse(llm_output: &str, original_query: &str) -> Self {
        let body = llm_output
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let raw: RawDecision = match serde_json::from_str(body) {
            Ok(r) => r,
            Err(e) => {
                debug!("Route decision unreadable, using passage search: {}", e);
                return Self::fallback(original_query);
            }
        };
        let tool = match raw.tool.as_deref().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("kg") => RetrievalTool::Kg,
            _ => RetrievalTool::Vector,
        };
        let final_query = raw
            .final_query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| original_query.to_string());
        Self { final_query, tool }
    }
}
