//! Requirement node merging.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::chunk::RecordedChunk;
use crate::normalize::{parse_optional_credits, parse_year, value_text};
use crate::report::MergeReport;
use gradkg_core::{MajorType, Requirement, RequirementKey};

#[derive(Debug, Default, Deserialize)]
struct RequirementResponse {
    #[serde(default)]
    nodes: Vec<Value>,
}

/// Requirement node as extracted. Numbers may arrive as strings.
#[derive(Debug, Default, Deserialize)]
struct RawRequirement {
    id: Option<Value>,
    year: Option<Value>,
    department: Option<Value>,
    major_type: Option<Value>,
    total_credits: Option<Value>,
    credits_major_basic: Option<Value>,
    credits_major_required: Option<Value>,
    credits_major_elective: Option<Value>,
    credits_industry_required: Option<Value>,
}

impl RawRequirement {
    fn into_requirement(self) -> Result<Requirement, String> {
        let year = parse_year(self.year.as_ref()).ok_or("missing or unreadable year")?;
        let department = self
            .department
            .as_ref()
            .and_then(value_text)
            .ok_or("missing department")?;
        let major_type: MajorType = self
            .major_type
            .as_ref()
            .and_then(value_text)
            .ok_or("missing major type")?
            .parse()
            .map_err(|e: gradkg_core::Error| e.to_string())?;
        let id = self
            .id
            .as_ref()
            .and_then(value_text)
            .unwrap_or_else(|| RequirementKey::new(year, department.clone(), major_type).id());

        Ok(Requirement {
            id,
            year,
            department,
            major_type,
            total_credits: parse_optional_credits(self.total_credits.as_ref()),
            credits_major_basic: parse_optional_credits(self.credits_major_basic.as_ref()),
            credits_major_required: parse_optional_credits(self.credits_major_required.as_ref()),
            credits_major_elective: parse_optional_credits(self.credits_major_elective.as_ref()),
            credits_industry_required: parse_optional_credits(
                self.credits_industry_required.as_ref(),
            ),
        })
    }
}

/// Merge requirement nodes. The first node seen for an id wins; double
/// and minor tracks lose their total-credit figure.
pub fn merge_requirements(chunks: &[RecordedChunk]) -> (Vec<Requirement>, MergeReport) {
    let mut report = MergeReport::default();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        let response: RequirementResponse = match chunk.parse_response() {
            Ok(r) => r,
            Err(e) => {
                report.record_failure(i, &chunk.metadata.department, e.to_string());
                continue;
            }
        };
        for node in response.nodes {
            let req = match serde_json::from_value::<RawRequirement>(node)
                .map_err(|e| e.to_string())
                .and_then(RawRequirement::into_requirement)
            {
                Ok(r) => r,
                Err(e) => {
                    debug!("requirement node rejected: {}", e);
                    report.nodes_rejected += 1;
                    continue;
                }
            };
            if seen.insert(req.id.clone()) {
                out.push(req.normalized());
            }
        }
        report.record_success();
    }

    report.log_summary("Requirement merge");
    (out, report)
}
