//! SUBSTITUTES merge resolver.
//!
//! Substitution tables often mention courses that are missing from the
//! subject tables, so each chunk may introduce new subject nodes next to
//! its edges. An early chunk may only know a course by name and file it
//! under a placeholder id (the name itself); a later chunk may reveal the
//! official code. That later node promotes the placeholder: the node moves
//! to the real id and every edge that named the placeholder follows it,
//! including edges seen before the promotion.
//!
//! Resolution runs in two phases. Chunk outputs are first appended to an
//! [`ExtractionLog`]; [`resolve_substitutes`] then folds the log once, in
//! order, recording promotions in an [`AliasMap`] and rewriting edge
//! endpoints only after the fold.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::chunk::{ChunkMetadata, RecordedChunk};
use crate::normalize::{is_real_id, parse_credits, parse_year, value_text};
use crate::report::{MergeReport, Promotion};
use crate::subjects::RawSubject;
use gradkg_core::{Subject, Substitutes};

/// Substitution edge as emitted by the model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubstitute {
    #[serde(default)]
    pub source_id: Option<Value>,
    #[serde(default)]
    pub target_id: Option<Value>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default)]
    pub note: Option<String>,
}

/// One chunk's answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubstituteExtraction {
    #[serde(default)]
    pub relationships: Vec<RawSubstitute>,
    #[serde(default)]
    pub new_nodes: Vec<RawSubject>,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub index: usize,
    pub metadata: ChunkMetadata,
    pub outcome: std::result::Result<SubstituteExtraction, String>,
}

/// Append-only record of chunk outcomes, in input order.
#[derive(Debug, Clone, Default)]
pub struct ExtractionLog {
    entries: Vec<LogEntry>,
}

impl ExtractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks(chunks: &[RecordedChunk]) -> Self {
        let mut log = Self::new();
        for chunk in chunks {
            log.push_chunk(chunk);
        }
        log
    }

    /// Parse a recorded chunk and append the outcome.
    pub fn push_chunk(&mut self, chunk: &RecordedChunk) {
        let outcome = chunk
            .parse_response::<SubstituteExtraction>()
            .map_err(|e| e.to_string());
        self.push(chunk.metadata.clone(), outcome);
    }

    pub fn push(
        &mut self,
        metadata: ChunkMetadata,
        outcome: std::result::Result<SubstituteExtraction, String>,
    ) {
        let index = self.entries.len();
        self.entries.push(LogEntry {
            index,
            metadata,
            outcome,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

/// Placeholder → real id links with path compression on lookup.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    parent: HashMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `placeholder` at `real_id`. Self links are ignored.
    pub fn link(&mut self, placeholder: &str, real_id: &str) {
        let root = self.resolve(real_id);
        if root != placeholder {
            self.parent.insert(placeholder.to_string(), root);
        }
    }

    /// Final id for `id`; ids never linked map to themselves.
    pub fn resolve(&mut self, id: &str) -> String {
        let mut root = id.to_string();
        let mut path = Vec::new();
        while let Some(next) = self.parent.get(&root) {
            if path.len() > self.parent.len() {
                break;
            }
            path.push(root.clone());
            root = next.clone();
        }
        for node in path {
            self.parent.insert(node, root.clone());
        }
        root
    }
}

/// Result of a substitution merge run.
#[derive(Debug, Clone, Default)]
pub struct SubstituteMerge {
    /// Subjects that were not known before the run, in first-seen order.
    pub new_nodes: Vec<Subject>,
    pub relationships: Vec<Substitutes>,
    pub id_to_name: HashMap<String, String>,
    pub report: MergeReport,
}

/// Fold state. Nodes live in `slots` so a promoted placeholder can be
/// removed without disturbing the order of the others.
struct Fold<'a> {
    known: &'a HashMap<String, String>,
    slots: Vec<Option<Subject>>,
    index: HashMap<String, usize>,
    aliases: AliasMap,
    id_to_name: HashMap<String, String>,
    edges: Vec<Substitutes>,
    report: MergeReport,
}

impl<'a> Fold<'a> {
    fn new(known: &'a HashMap<String, String>) -> Self {
        Self {
            known,
            slots: Vec::new(),
            index: HashMap::new(),
            aliases: AliasMap::new(),
            id_to_name: known.clone(),
            edges: Vec::new(),
            report: MergeReport::default(),
        }
    }

    fn node(&mut self, raw: &RawSubject) {
        let Some(id) = raw.id.as_ref().and_then(value_text) else {
            self.report.nodes_rejected += 1;
            return;
        };
        if self.known.contains_key(&id) {
            self.report.nodes_skipped_known += 1;
            return;
        }
        let name = raw.name.as_ref().and_then(value_text).unwrap_or_else(|| id.clone());
        let credits = parse_credits(raw.credits.as_ref());

        let placeholder_pending = name != id
            && is_real_id(&id)
            && !is_real_id(&name)
            && self.index.contains_key(&name);
        if placeholder_pending {
            self.promote(&name, id, credits);
            return;
        }

        // A placeholder already promoted earlier keeps feeding the real node.
        let target = self.aliases.resolve(&id);
        self.id_to_name.entry(target.clone()).or_insert_with(|| name.clone());
        if target == id {
            self.id_to_name.insert(id.clone(), name.clone());
        }
        match self.index.get(&target).copied() {
            Some(pos) => self.backfill(pos, credits),
            None => self.insert(Subject::new(target, name, credits)),
        }
    }

    fn promote(&mut self, placeholder: &str, real_id: String, credits: u32) {
        let Some(pos) = self.index.remove(placeholder) else {
            return;
        };
        let old = self.slots[pos].take();
        let name = placeholder.to_string();
        info!("ID promoted: {} -> {}", placeholder, real_id);

        self.aliases.link(placeholder, &real_id);
        self.id_to_name.remove(placeholder);
        self.id_to_name.insert(real_id.clone(), name.clone());
        self.report.promotions.push(Promotion {
            placeholder: placeholder.to_string(),
            real_id: real_id.clone(),
        });

        match self.index.get(&real_id).copied() {
            Some(existing) => self.backfill(existing, credits),
            None => {
                let mut subject = Subject::new(real_id, name, credits);
                if subject.credits == 0 {
                    subject.credits = old.map(|s| s.credits).unwrap_or(0);
                }
                self.insert(subject);
            }
        }
    }

    fn insert(&mut self, subject: Subject) {
        self.index.insert(subject.id.clone(), self.slots.len());
        self.slots.push(Some(subject));
    }

    /// Credits are only filled in when the first extraction had none.
    fn backfill(&mut self, pos: usize, credits: u32) {
        if let Some(existing) = self.slots[pos].as_mut() {
            if existing.credits == 0 && credits > 0 {
                existing.credits = credits;
            }
        }
    }

    fn relationship(&mut self, raw: &RawSubstitute, meta: &ChunkMetadata) {
        let source = raw.source_id.as_ref().and_then(value_text);
        let target = raw.target_id.as_ref().and_then(value_text);
        let (Some(source), Some(target)) = (source, target) else {
            self.report.relationships_rejected += 1;
            return;
        };
        if source == target {
            self.report.relationships_rejected += 1;
            return;
        }
        let mut edge = Substitutes::new(source, target);
        edge.department = raw
            .department
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| meta.department.clone());
        edge.year = parse_year(raw.year.as_ref()).or(meta.year);
        edge.note = raw.note.clone().filter(|n| !n.trim().is_empty());
        self.edges.push(edge);
    }

    fn finish(mut self) -> SubstituteMerge {
        let mut relationships: Vec<Substitutes> = Vec::new();
        let mut positions: HashMap<(String, String, String, Option<i32>), usize> = HashMap::new();

        for mut edge in std::mem::take(&mut self.edges) {
            edge.source_id = self.aliases.resolve(&edge.source_id);
            edge.target_id = self.aliases.resolve(&edge.target_id);
            if edge.source_id == edge.target_id {
                debug!("dropping self substitution on {}", edge.source_id);
                self.report.relationships_rejected += 1;
                continue;
            }
            edge.source_name = Some(self.display_name(&edge.source_id));
            edge.target_name = Some(self.display_name(&edge.target_id));

            match positions.get(&edge.dedup_key()).copied() {
                Some(pos) => relationships[pos] = edge,
                None => {
                    positions.insert(edge.dedup_key(), relationships.len());
                    relationships.push(edge);
                }
            }
        }

        self.report.log_summary("Substitute merge");
        info!(
            "{} relationships, {} new subjects",
            relationships.len(),
            self.index.len()
        );
        SubstituteMerge {
            new_nodes: self.slots.into_iter().flatten().collect(),
            relationships,
            id_to_name: self.id_to_name,
            report: self.report,
        }
    }

    fn display_name(&self, id: &str) -> String {
        self.id_to_name
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

/// Fold the log against the subjects known before the run.
pub fn resolve_substitutes(log: &ExtractionLog, known: &[Subject]) -> SubstituteMerge {
    let known: HashMap<String, String> = known
        .iter()
        .map(|s| (s.id.clone(), s.name.clone()))
        .collect();
    let mut fold = Fold::new(&known);

    for entry in log.entries() {
        match &entry.outcome {
            Ok(extraction) => {
                for raw in &extraction.new_nodes {
                    fold.node(raw);
                }
                for raw in &extraction.relationships {
                    fold.relationship(raw, &entry.metadata);
                }
                debug!(
                    "chunk {}: {} relationships, {} new nodes",
                    entry.index + 1,
                    extraction.relationships.len(),
                    extraction.new_nodes.len()
                );
                fold.report.record_success();
            }
            Err(reason) => {
                fold.report
                    .record_failure(entry.index, &entry.metadata.department, reason.clone());
            }
        }
    }

    fold.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> ChunkMetadata {
        ChunkMetadata {
            department: "컴퓨터공학과".into(),
            year: Some(2025),
            ..Default::default()
        }
    }

    fn log_of(responses: Vec<Value>) -> ExtractionLog {
        let chunks: Vec<RecordedChunk> = responses
            .into_iter()
            .map(|r| RecordedChunk::new(meta(), r))
            .collect();
        ExtractionLog::from_chunks(&chunks)
    }

    #[test]
    fn test_promotion_retargets_earlier_relationships() {
        let log = log_of(vec![
            json!({"new_nodes": [{"id": "자료구조", "name": "자료구조"}]}),
            json!({"relationships": [{"source_id": "X", "target_id": "자료구조", "department": "컴퓨터공학과", "year": 2025}]}),
            json!({"new_nodes": [{"id": "CSE101", "name": "자료구조", "credits": 3}]}),
        ]);
        let merged = resolve_substitutes(&log, &[]);

        assert_eq!(merged.relationships.len(), 1);
        assert_eq!(merged.relationships[0].target_id, "CSE101");
        assert_eq!(merged.relationships[0].target_name.as_deref(), Some("자료구조"));
        assert_eq!(merged.relationships[0].source_name.as_deref(), Some("X"));
        assert!(merged.new_nodes.iter().all(|n| n.id != "자료구조"));
        assert_eq!(merged.new_nodes.len(), 1);
        assert_eq!(merged.new_nodes[0].credits, 3);
        assert!(!merged.id_to_name.contains_key("자료구조"));
        assert_eq!(
            merged.report.promotions,
            vec![Promotion {
                placeholder: "자료구조".into(),
                real_id: "CSE101".into()
            }]
        );
    }

    #[test]
    fn test_placeholder_seen_after_promotion_joins_real_node() {
        let log = log_of(vec![
            json!({"new_nodes": [{"id": "운영체제", "name": "운영체제"}]}),
            json!({"new_nodes": [{"id": "CSE102", "name": "운영체제"}]}),
            json!({
                "new_nodes": [{"id": "운영체제", "name": "운영체제", "credits": 3}],
                "relationships": [{"source_id": "운영체제", "target_id": "OLD9", "department": "컴퓨터공학과"}]
            }),
        ]);
        let merged = resolve_substitutes(&log, &[]);
        assert_eq!(merged.new_nodes.len(), 1);
        assert_eq!(merged.new_nodes[0].id, "CSE102");
        assert_eq!(merged.new_nodes[0].credits, 3);
        assert_eq!(merged.relationships[0].source_id, "CSE102");
        assert_eq!(merged.relationships[0].year, Some(2025));
    }

    #[test]
    fn test_duplicate_relationships_last_seen_wins() {
        let log = log_of(vec![
            json!({"relationships": [
                {"source_id": "CSE101", "target_id": "OLD1", "department": "컴퓨터공학과", "year": 2025, "note": "first"},
                {"source_id": "CSE102", "target_id": "OLD2", "department": "컴퓨터공학과", "year": 2025}
            ]}),
            json!({"relationships": [
                {"source_id": "CSE101", "target_id": "OLD1", "department": "컴퓨터공학과", "year": 2025, "note": "second"}
            ]}),
        ]);
        let merged = resolve_substitutes(&log, &[]);
        assert_eq!(merged.relationships.len(), 2);
        assert_eq!(merged.relationships[0].source_id, "CSE101");
        assert_eq!(merged.relationships[0].note.as_deref(), Some("second"));
        assert_eq!(merged.relationships[0].rel_type, gradkg_core::SUBSTITUTES);
    }

    #[test]
    fn test_known_nodes_skipped_and_names_resolved() {
        let known = vec![Subject::new("CSE101", "자료구조", 3)];
        let log = log_of(vec![json!({
            "new_nodes": [
                {"id": "CSE101", "name": "다른이름", "credits": 4},
                {"id": "OLD1", "name": "자료구조및실습", "credits": "3"},
                {"id": "OLD1", "name": "자료구조및실습", "credits": 4},
                {"name": "이름만"}
            ],
            "relationships": [
                {"source_id": "CSE101", "target_id": "OLD1"},
                {"source_id": "CSE101", "target_id": "CSE101"},
                {"source_id": "CSE101"}
            ]
        })]);
        let merged = resolve_substitutes(&log, &known);
        assert_eq!(merged.report.nodes_skipped_known, 1);
        assert_eq!(merged.report.nodes_rejected, 1);
        assert_eq!(merged.report.relationships_rejected, 2);
        assert_eq!(merged.new_nodes.len(), 1);
        assert_eq!(merged.new_nodes[0].credits, 3);

        let edge = &merged.relationships[0];
        assert_eq!(edge.source_name.as_deref(), Some("자료구조"));
        assert_eq!(edge.target_name.as_deref(), Some("자료구조및실습"));
        assert_eq!(edge.department, "컴퓨터공학과");
    }

    #[test]
    fn test_credits_backfilled_only_when_missing() {
        let log = log_of(vec![
            json!({"new_nodes": [{"id": "OLD1", "name": "구과목"}]}),
            json!({"new_nodes": [{"id": "OLD1", "name": "구과목", "credits": 2}]}),
            json!({"new_nodes": [{"id": "OLD1", "name": "구과목", "credits": 5}]}),
        ]);
        let merged = resolve_substitutes(&log, &[]);
        assert_eq!(merged.new_nodes[0].credits, 2);
    }

    #[test]
    fn test_failed_chunk_does_not_stop_the_run() {
        let mut log = ExtractionLog::new();
        log.push(meta(), Err("upstream timeout".into()));
        log.push_chunk(&RecordedChunk::new(meta(), json!("{broken")));
        log.push_chunk(&RecordedChunk::new(
            meta(),
            json!({"relationships": [{"source_id": "A1", "target_id": "B1"}]}),
        ));
        let merged = resolve_substitutes(&log, &[]);
        assert_eq!(merged.report.chunks_total, 3);
        assert_eq!(merged.report.succeeded, 1);
        assert_eq!(merged.report.failures.len(), 2);
        assert_eq!(merged.report.failures[0].reason, "upstream timeout");
        assert_eq!(merged.relationships.len(), 1);
    }

    #[test]
    fn test_promotion_collapsing_an_edge_drops_it() {
        let log = log_of(vec![
            json!({
                "new_nodes": [{"id": "이산수학", "name": "이산수학"}],
                "relationships": [{"source_id": "MAT201", "target_id": "이산수학"}]
            }),
            json!({"new_nodes": [{"id": "MAT201", "name": "이산수학"}]}),
        ]);
        let merged = resolve_substitutes(&log, &[]);
        assert!(merged.relationships.is_empty());
        assert_eq!(merged.report.relationships_rejected, 1);
    }

    #[test]
    fn test_alias_map_compresses_paths() {
        let mut aliases = AliasMap::new();
        aliases.link("b", "c");
        aliases.link("a", "b");
        assert_eq!(aliases.resolve("a"), "c");
        assert_eq!(aliases.resolve("c"), "c");
        aliases.link("c", "c");
        assert_eq!(aliases.resolve("c"), "c");
        assert_eq!(aliases.resolve("b"), "c");
        assert_eq!(aliases.resolve("unlinked"), "unlinked");
    }
}
