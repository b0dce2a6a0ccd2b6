//! Curriculum graph model: graduation requirements, subjects and the edges
//! between them.
//!
//! Enum values are accepted in either their snake_case form or the Korean
//! label printed in the curriculum documents. Whitespace inside labels is
//! ignored since table extraction tends to break words apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Relationship type attached to every accepted substitution edge.
pub const SUBSTITUTES: &str = "SUBSTITUTES";

/// Relationship type of requirement → subject edges.
pub const INCLUDES: &str = "INCLUDES";

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

macro_rules! label_deserialize {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(d)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Major track a requirement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorType {
    Single,
    Double,
    Minor,
}

impl MajorType {
    pub const ALL: [MajorType; 3] = [Self::Single, Self::Double, Self::Minor];

    /// Label used by the curriculum documents and inside requirement ids.
    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "단일전공",
            Self::Double => "다전공",
            Self::Minor => "부전공",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Minor => "minor",
        }
    }

    /// Only the primary track carries a total-credit requirement.
    pub fn has_total_credits(self) -> bool {
        matches!(self, Self::Single)
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MajorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match compact(s).as_str() {
            "single" | "단일전공" => Ok(Self::Single),
            "double" | "다전공" => Ok(Self::Double),
            "minor" | "부전공" => Ok(Self::Minor),
            _ => Err(Error::InvalidInput(format!("unknown major type: {}", s))),
        }
    }
}

label_deserialize!(MajorType);

/// Main classification of a subject inside a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    MajorRequired,
    MajorElective,
    MajorBasic,
}

impl Classification {
    pub const ALL: [Classification; 3] = [Self::MajorRequired, Self::MajorElective, Self::MajorBasic];

    pub fn label(self) -> &'static str {
        match self {
            Self::MajorRequired => "전공필수",
            Self::MajorElective => "전공선택",
            Self::MajorBasic => "전공기초",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MajorRequired => "major_required",
            Self::MajorElective => "major_elective",
            Self::MajorBasic => "major_basic",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Self::MajorRequired)
    }

    /// Whether unmet subjects of this classification are reported as missing.
    /// Electives leave the student free to pick, so they never are.
    pub fn reports_missing(self) -> bool {
        matches!(self, Self::MajorRequired | Self::MajorBasic)
    }

    /// Resolve two disagreeing extractions: required wins, otherwise the
    /// existing value stays.
    pub fn merge(self, other: Classification) -> Classification {
        if self.is_required() || !other.is_required() {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match compact(s).as_str() {
            "major_required" | "전공필수" => Ok(Self::MajorRequired),
            "major_elective" | "전공선택" => Ok(Self::MajorElective),
            "major_basic" | "전공기초" => Ok(Self::MajorBasic),
            _ => Err(Error::InvalidInput(format!("unknown classification: {}", s))),
        }
    }
}

label_deserialize!(Classification);

/// Detail classification. Only industry-required subjects are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubClassification {
    IndustryRequired,
}

impl SubClassification {
    pub fn label(self) -> &'static str {
        "산학필수"
    }

    pub fn as_str(self) -> &'static str {
        "industry_required"
    }
}

impl FromStr for SubClassification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match compact(s).as_str() {
            "industry_required" | "산학필수" => Ok(Self::IndustryRequired),
            _ => Err(Error::InvalidInput(format!("unknown sub classification: {}", s))),
        }
    }
}

label_deserialize!(SubClassification);

/// Credit buckets reported by the graduation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditCategory {
    MajorRequired,
    MajorElective,
    MajorBasic,
    IndustryRequired,
}

impl CreditCategory {
    pub const ALL: [CreditCategory; 4] = [
        Self::MajorRequired,
        Self::MajorElective,
        Self::MajorBasic,
        Self::IndustryRequired,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MajorRequired => "전공필수",
            Self::MajorElective => "전공선택",
            Self::MajorBasic => "전공기초",
            Self::IndustryRequired => "산학필수",
        }
    }
}

impl From<Classification> for CreditCategory {
    fn from(c: Classification) -> Self {
        match c {
            Classification::MajorRequired => Self::MajorRequired,
            Classification::MajorElective => Self::MajorElective,
            Classification::MajorBasic => Self::MajorBasic,
        }
    }
}

/// Identifies one requirement set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementKey {
    pub year: i32,
    pub department: String,
    pub major_type: MajorType,
}

impl RequirementKey {
    pub fn new(year: i32, department: impl Into<String>, major_type: MajorType) -> Self {
        Self {
            year,
            department: department.into(),
            major_type,
        }
    }

    /// Canonical requirement id, e.g. `2025_컴퓨터공학과_단일전공`.
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.year, self.department, self.major_type.label())
    }
}

/// Graduation rule set for one (year, department, major type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// `{year}_{department}_{major type label}`; derived when absent.
    #[serde(default)]
    pub id: String,
    pub year: i32,
    pub department: String,
    pub major_type: MajorType,
    #[serde(default)]
    pub total_credits: Option<u32>,
    #[serde(default)]
    pub credits_major_basic: Option<u32>,
    #[serde(default)]
    pub credits_major_required: Option<u32>,
    #[serde(default)]
    pub credits_major_elective: Option<u32>,
    #[serde(default)]
    pub credits_industry_required: Option<u32>,
}

impl Requirement {
    pub fn key(&self) -> RequirementKey {
        RequirementKey::new(self.year, self.department.clone(), self.major_type)
    }

    /// Credits demanded for a category; absent values count as zero.
    pub fn required_credits(&self, category: CreditCategory) -> u32 {
        let value = match category {
            CreditCategory::MajorRequired => self.credits_major_required,
            CreditCategory::MajorElective => self.credits_major_elective,
            CreditCategory::MajorBasic => self.credits_major_basic,
            CreditCategory::IndustryRequired => self.credits_industry_required,
        };
        value.unwrap_or(0)
    }

    /// Clear `total_credits` on tracks that do not carry one.
    pub fn normalized(mut self) -> Self {
        if !self.major_type.has_total_credits() {
            self.total_credits = None;
        }
        self
    }
}

/// A course, identified by its official code or, failing that, its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub credits: u32,
    #[serde(default)]
    pub credits_note: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>, name: impl Into<String>, credits: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            credits,
            credits_note: None,
        }
    }

    /// Canonical name followed by every alias.
    pub fn known_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Requirement → subject edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Includes {
    pub requirement_id: String,
    pub subject_id: String,
    pub classification: Classification,
    #[serde(default)]
    pub sub_classification: Option<SubClassification>,
}

impl Includes {
    /// Fold a second extraction of the same edge into this one.
    pub fn merge(&mut self, other: &Includes) {
        self.classification = self.classification.merge(other.classification);
        self.sub_classification = self.sub_classification.or(other.sub_classification);
    }
}

/// Subject → subject edge: the target may be counted in place of the source
/// when checking graduation credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitutes {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(rename = "type", default = "substitutes_type")]
    pub rel_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
}

fn substitutes_type() -> String {
    SUBSTITUTES.to_string()
}

impl Substitutes {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            department: String::new(),
            year: None,
            note: None,
            rel_type: substitutes_type(),
            source_name: None,
            target_name: None,
        }
    }

    /// Identity used when deduplicating extracted edges.
    pub fn dedup_key(&self) -> (String, String, String, Option<i32>) {
        (
            self.source_id.clone(),
            self.target_id.clone(),
            self.department.clone(),
            self.year,
        )
    }
}
