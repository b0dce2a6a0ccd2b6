//! Requirement graph rendered as answer context.

use serde::Serialize;
use serde_json::json;

use gradkg_core::{MajorType, Result};
use gradkg_store::{GraphStore, KgRow};

pub const KG_SOURCE: &str = "Knowledge Graph";

/// Every year's requirements for one department and major type, as one
/// JSON document the answer model can compare across years.
#[derive(Debug, Clone, Serialize)]
pub struct KgContext {
    pub source: &'static str,
    pub department: String,
    pub major_type: MajorType,
    pub years: Vec<i32>,
    pub rows: usize,
    pub text: String,
}

impl KgContext {
    pub fn build(store: &GraphStore, department: &str, major_type: MajorType) -> Result<Self> {
        let rows = store.kg_rows(department, major_type)?;
        Self::from_rows(department, major_type, &rows)
    }

    pub fn from_rows(department: &str, major_type: MajorType, rows: &[KgRow]) -> Result<Self> {
        let items: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                json!({
                    "연도": row.requirement.year,
                    "졸업요건_요약": row.requirement,
                    "과목정보": {
                        "과목명": row.subject_name,
                        "학수번호": row.subject_id,
                        "이수구분": row.classification.label(),
                        "상세구분": row.sub_classification.map(|s| s.label()),
                    }
                })
            })
            .collect();

        let mut years: Vec<i32> = rows.iter().map(|r| r.requirement.year).collect();
        years.dedup();

        Ok(Self {
            source: KG_SOURCE,
            department: department.to_string(),
            major_type,
            years,
            rows: rows.len(),
            text: serde_json::to_string_pretty(&items)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
