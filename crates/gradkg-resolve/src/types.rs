//! Resolver types.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use gradkg_core::{CreditCategory, MajorType, Requirement, RequirementKey};

/// Input to a graduation check.
#[derive(Debug, Clone, Deserialize)]
pub struct GraduationQuery {
    pub year: i32,
    pub department: String,
    pub major_type: MajorType,
    /// Course names as the student typed them.
    #[serde(default)]
    pub taken: Vec<String>,
}

impl GraduationQuery {
    pub fn key(&self) -> RequirementKey {
        RequirementKey::new(self.year, self.department.clone(), self.major_type)
    }
}

/// A required subject the student has not taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSubject {
    pub name: String,
    pub credits: u32,
    /// Substitute names joined by `", "`, or `"none"`.
    pub alternatives: String,
    pub note: String,
}

/// Credit progress in one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditStatus {
    pub required: u32,
    pub earned: u32,
    pub remaining: u32,
}

impl CreditStatus {
    pub fn new(required: u32, earned: u32) -> Self {
        Self {
            required,
            earned,
            remaining: required.saturating_sub(earned),
        }
    }
}

/// Result of a graduation check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraduationReport {
    /// `None` when no requirement exists for the query; serialized as `{}`.
    #[serde(serialize_with = "summary_or_empty")]
    pub requirement_summary: Option<Requirement>,
    /// Only major_required and major_basic appear; empty categories are
    /// left out.
    pub missing_by_category: BTreeMap<CreditCategory, Vec<MissingSubject>>,
    /// Always holds all four categories.
    pub credit_status: BTreeMap<CreditCategory, CreditStatus>,
}

fn summary_or_empty<S: Serializer>(summary: &Option<Requirement>, s: S) -> Result<S::Ok, S::Error> {
    match summary {
        Some(requirement) => requirement.serialize(s),
        None => s.serialize_map(Some(0))?.end(),
    }
}

impl GraduationReport {
    pub fn missing_count(&self) -> usize {
        self.missing_by_category.values().map(Vec::len).sum()
    }
}

/// Retrieval tool chosen for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalTool {
    /// Requirement graph across every year.
    #[serde(rename = "KG")]
    Kg,
    /// Passage search in the admission year and the latest year.
    Vector,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Who is asking: decides which regulations apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub admission_year: i32,
    pub department: String,
    #[serde(default = "default_major_type")]
    pub major_type: MajorType,
}

fn default_major_type() -> MajorType {
    MajorType::Single
}
