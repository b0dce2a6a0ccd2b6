//! Subject node merging across chunks and years.
//!
//! The first extraction of an id fixes its canonical name and credits.
//! Later extractions under the same id with a different name (the course
//! was renamed between curricula) become aliases.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::chunk::RecordedChunk;
use crate::normalize::{clean_subject_id, clean_subject_name, compact, parse_credits, value_text};
use crate::report::MergeReport;
use gradkg_core::Subject;

/// Field-practice activities are credited per activity, so the table shows
/// no single credit value for them.
pub const FIELD_PRACTICE_IDS: [&str; 4] = ["창업현장실습", "단기현장실습", "장기현장실습", "현장실습"];

pub const FIELD_PRACTICE_NOTE: &str = "창업현장실습,단기현장실습/장기현장실습은 각 활동별로 3학점, 6학점, 9학점, 12학점을 산학필수학점으로 이수함";

/// Subject node as emitted by the model. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubject {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub credits: Option<Value>,
    #[serde(default)]
    pub credits_note: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SubjectResponse {
    #[serde(default)]
    nodes: Vec<RawSubject>,
}

/// Accumulates subject nodes in first-seen order.
#[derive(Debug, Default)]
pub struct SubjectMerger {
    nodes: Vec<Subject>,
    index: HashMap<String, usize>,
    report: MergeReport,
}

impl SubjectMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, position: usize, chunk: &RecordedChunk) {
        let response: SubjectResponse = match chunk.parse_response() {
            Ok(r) => r,
            Err(e) => {
                self.report
                    .record_failure(position, &chunk.metadata.department, e.to_string());
                return;
            }
        };
        for raw in &response.nodes {
            self.merge_node(raw);
        }
        self.report.record_success();
    }

    fn merge_node(&mut self, raw: &RawSubject) {
        let Some(id) = raw.id.as_ref().and_then(value_text).map(|s| clean_subject_id(&s)) else {
            self.report.nodes_rejected += 1;
            return;
        };
        if id.is_empty() {
            self.report.nodes_rejected += 1;
            return;
        }
        let name = raw
            .name
            .as_ref()
            .and_then(value_text)
            .map(|s| clean_subject_name(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| id.clone());

        match self.index.get(&id).copied() {
            None => {
                let mut subject = Subject::new(id.clone(), name, parse_credits(raw.credits.as_ref()));
                subject.credits_note = raw.credits_note.as_ref().and_then(value_text);
                self.index.insert(id, self.nodes.len());
                self.nodes.push(subject);
            }
            Some(pos) => {
                let existing = &mut self.nodes[pos];
                let new = compact(&name);
                let seen = compact(&existing.name) == new
                    || existing.aliases.iter().any(|a| compact(a) == new);
                if !seen {
                    debug!("alias added: {} ({} <- {})", id, existing.name, name);
                    existing.aliases.push(name);
                }
            }
        }
    }

    /// Apply the field-practice override and return the merged nodes.
    pub fn finish(mut self) -> (Vec<Subject>, MergeReport) {
        for subject in &mut self.nodes {
            if FIELD_PRACTICE_IDS.contains(&subject.id.as_str()) {
                subject.credits = 0;
                subject.credits_note = Some(FIELD_PRACTICE_NOTE.to_string());
            }
        }
        self.report.log_summary("Subject merge");
        (self.nodes, self.report)
    }
}

/// Merge every chunk's subject nodes in input order.
pub fn merge_subjects(chunks: &[RecordedChunk]) -> (Vec<Subject>, MergeReport) {
    let mut merger = SubjectMerger::new();
    for (i, chunk) in chunks.iter().enumerate() {
        merger.ingest(i, chunk);
    }
    merger.finish()
}
