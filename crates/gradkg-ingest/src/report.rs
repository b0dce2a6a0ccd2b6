//! Per-run accounting shared by every merger.

use serde::Serialize;
use tracing::{info, warn};

/// A chunk that contributed nothing, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub index: usize,
    pub department: String,
    pub reason: String,
}

/// A placeholder id replaced by the official code discovered later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub placeholder: String,
    pub real_id: String,
}

/// Outcome of one merge run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub chunks_total: usize,
    pub succeeded: usize,
    pub failures: Vec<ChunkFailure>,
    pub promotions: Vec<Promotion>,
    /// Nodes dropped for a missing id or an unreadable shape.
    pub nodes_rejected: usize,
    /// Nodes already present among the canonical subjects.
    pub nodes_skipped_known: usize,
    /// Edges dropped for a missing or unknown endpoint, a self reference
    /// or an unreadable classification.
    pub relationships_rejected: usize,
}

impl MergeReport {
    pub fn record_success(&mut self) {
        self.chunks_total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, index: usize, department: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Chunk {} ({}) skipped: {}", index + 1, department, reason);
        self.chunks_total += 1;
        self.failures.push(ChunkFailure {
            index,
            department: department.to_string(),
            reason,
        });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Log a one-line summary.
    pub fn log_summary(&self, what: &str) {
        info!(
            "{}: {}/{} chunks merged, {} failed, {} promotions, {} nodes rejected, {} known nodes skipped, {} relationships rejected",
            what,
            self.succeeded,
            self.chunks_total,
            self.failed(),
            self.promotions.len(),
            self.nodes_rejected,
            self.nodes_skipped_known,
            self.relationships_rejected
        );
    }
}
