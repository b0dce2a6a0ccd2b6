//! Row types returned by the graph store.

use gradkg_core::{Classification, Includes, Requirement, SubClassification, Subject};
use serde::{Deserialize, Serialize};

/// One joined row for a requirement: an included subject, how it is
/// classified, and at most one of its substitutes. A subject with several
/// substitution edges yields several rows.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementRow {
    pub subject: Subject,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_classification: Option<SubClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitute: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitute_note: Option<String>,
}

/// Requirement/subject pair across years, used as chat context.
#[derive(Debug, Clone, Serialize)]
pub struct KgRow {
    pub requirement: Requirement,
    pub subject_id: String,
    pub subject_name: String,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_classification: Option<SubClassification>,
}

/// Full graph payload loaded by `replace_graph`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub includes: Vec<Includes>,
}

/// Counts from a write batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// A pre-chunked regulation passage to index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPassage {
    pub text: String,
    pub source: String,
    pub seq_num: i64,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A passage returned from full-text search.
#[derive(Debug, Clone, Serialize)]
pub struct PassageHit {
    pub id: i64,
    pub text: String,
    pub source: String,
    pub seq_num: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub score: f64,
}

/// Restricts passage search to one year and a set of departments.
#[derive(Debug, Clone)]
pub struct PassageFilter {
    pub year: i32,
    pub departments: Vec<String>,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub requirements: i64,
    pub subjects: i64,
    pub includes: i64,
    pub substitutes: i64,
    pub passages: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
