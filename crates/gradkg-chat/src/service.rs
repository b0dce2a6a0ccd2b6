//! Retrieval-augmented chat over the requirement graph and regulation
//! passages.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::LLMConfig;
use crate::prompt::{answer_prompt, intent_prompt, KG_SOURCE_LABEL, NOT_FOUND_ANSWER, NO_SOURCE};
use crate::providers::Completion;
use crate::types::{ChatAnswer, ChatStatus, CompletionRequest};
use gradkg_core::{GradKgConfig, Result};
use gradkg_resolve::{format_history, ChatTurn, KgContext, RetrievalTool, RouteDecision, StudentProfile};
use gradkg_store::{GraphStore, PassageFilter, PassageHit};

/// Retrieval knobs taken from the server config.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Newest regulation year; always searched next to the admission year.
    pub latest_year: i32,
    pub top_k: usize,
    pub colleges: BTreeMap<String, String>,
}

impl ChatSettings {
    pub fn from_config(config: &GradKgConfig) -> Self {
        Self {
            latest_year: config.latest_year,
            top_k: config.top_k,
            colleges: config.colleges.clone(),
        }
    }
}

/// What one retrieval produced.
enum Retrieved {
    Kg(KgContext),
    Passages(Vec<PassageHit>),
}

impl Retrieved {
    fn is_empty(&self) -> bool {
        match self {
            Retrieved::Kg(ctx) => ctx.is_empty(),
            Retrieved::Passages(hits) => hits.is_empty(),
        }
    }

    fn context(&self) -> String {
        match self {
            Retrieved::Kg(ctx) => ctx.text.clone(),
            Retrieved::Passages(hits) => hits
                .iter()
                .map(|h| h.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    fn source_info(&self) -> String {
        match self {
            Retrieved::Kg(_) => KG_SOURCE_LABEL.to_string(),
            Retrieved::Passages(hits) => {
                let mut seq: Vec<i64> = hits.iter().map(|h| h.seq_num).collect();
                seq.sort_unstable();
                if seq.is_empty() {
                    NO_SOURCE.to_string()
                } else {
                    seq.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
                }
            }
        }
    }
}

pub struct ChatService {
    store: Arc<GraphStore>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(store: Arc<GraphStore>, settings: ChatSettings) -> Self {
        Self { store, settings }
    }

    /// Answer one question. The route decision may rewrite the question for
    /// retrieval; the answer is always composed for the question as asked.
    pub async fn chat<C: Completion>(
        &self,
        llm: &C,
        profile: &StudentProfile,
        query: &str,
        history: &[ChatTurn],
    ) -> Result<ChatAnswer> {
        let start = Instant::now();
        let history_text = format_history(history);

        let decision = self.route(llm, &history_text, query).await;
        info!(
            "Routed '{}' -> '{}' via {:?}",
            query, decision.final_query, decision.tool
        );

        let retrieved = match decision.tool {
            RetrievalTool::Kg => Retrieved::Kg(KgContext::build(
                &self.store,
                &profile.department,
                profile.major_type,
            )?),
            RetrievalTool::Vector => {
                Retrieved::Passages(self.search_passages(profile, &decision.final_query)?)
            }
        };

        let (message, source) = if retrieved.is_empty() {
            debug!("Nothing retrieved for '{}'", decision.final_query);
            (NOT_FOUND_ANSWER.to_string(), NO_SOURCE.to_string())
        } else {
            let prompt = answer_prompt(&retrieved.context(), &history_text, query, profile);
            let message = llm.complete(CompletionRequest::new(prompt)).await?;
            (message, retrieved.source_info())
        };

        Ok(ChatAnswer {
            message,
            source,
            tool: decision.tool,
            final_query: decision.final_query,
            model: llm.model().map(str::to_string),
            duration: start.elapsed().as_millis() as u64,
        })
    }

    async fn route<C: Completion>(&self, llm: &C, history: &str, query: &str) -> RouteDecision {
        let request = CompletionRequest::new(query)
            .with_system(intent_prompt(history, query, self.settings.latest_year))
            .json();
        match llm.complete(request).await {
            Ok(output) => RouteDecision::parse(&output, query),
            Err(e) => {
                warn!("Routing call failed, using passage search: {}", e);
                RouteDecision::fallback(query)
            }
        }
    }

    /// Passages for the admission year and the latest year, each limited to
    /// the department and its college. Hits sharing (source, seq_num) are
    /// kept once.
    pub fn search_passages(&self, profile: &StudentProfile, query: &str) -> Result<Vec<PassageHit>> {
        let mut departments = vec![profile.department.clone()];
        if let Some(college) = self.settings.colleges.get(&profile.department) {
            departments.push(college.clone());
        }

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for year in [profile.admission_year, self.settings.latest_year] {
            let filter = PassageFilter {
                year,
                departments: departments.clone(),
            };
            for hit in self.store.search_passages(query, &filter, self.settings.top_k)? {
                if seen.insert((hit.source.clone(), hit.seq_num)) {
                    hits.push(hit);
                }
            }
        }
        debug!("{} passages for '{}'", hits.len(), query);
        Ok(hits)
    }

    pub fn status(&self, config: &LLMConfig) -> Result<ChatStatus> {
        let stats = self.store.get_stats()?;
        let resolved = config.resolve_provider();
        Ok(ChatStatus {
            llm_available: resolved.is_some(),
            llm_provider: resolved.as_ref().map(|(p, _, _)| p.to_string()),
            default_model: resolved.map(|(_, m, _)| m),
            available_models: config.available_models(),
            passage_count: stats.passages,
            requirement_count: stats.requirements,
        })
    }
}
