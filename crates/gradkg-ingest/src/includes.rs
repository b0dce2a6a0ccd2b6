//! INCLUDES edge merging.
//!
//! Each chunk belongs to one requirement, found from its metadata. A
//! subject extracted under several classifications keeps the required one,
//! and the industry-required flag sticks once any extraction reports it.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::chunk::RecordedChunk;
use crate::normalize::value_text;
use crate::report::MergeReport;
use gradkg_core::{Classification, Includes, Requirement, RequirementKey, SubClassification, Subject};

#[derive(Debug, Default, Deserialize)]
struct RawIncludes {
    #[serde(default)]
    target_id: Option<Value>,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    sub_classification: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IncludesResponse {
    #[serde(default)]
    relationships: Vec<RawIncludes>,
}

pub fn merge_includes(
    chunks: &[RecordedChunk],
    requirements: &[Requirement],
    subjects: &[Subject],
) -> (Vec<Includes>, MergeReport) {
    let requirement_ids: HashMap<RequirementKey, &str> = requirements
        .iter()
        .map(|r| (r.key(), r.id.as_str()))
        .collect();
    let subject_ids: HashSet<&str> = subjects.iter().map(|s| s.id.as_str()).collect();

    let mut report = MergeReport::default();
    let mut edges: Vec<Includes> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (i, chunk) in chunks.iter().enumerate() {
        let meta = &chunk.metadata;
        let (Some(year), Some(major_type)) = (meta.year, meta.major_type()) else {
            report.record_failure(i, &meta.department, "metadata lacks a year or a readable track");
            continue;
        };
        let key = RequirementKey::new(year, meta.department.clone(), major_type);
        let Some(&requirement_id) = requirement_ids.get(&key) else {
            report.record_failure(i, &meta.department, format!("no requirement {}", key.id()));
            continue;
        };

        let response: IncludesResponse = match chunk.parse_response() {
            Ok(r) => r,
            Err(e) => {
                report.record_failure(i, &meta.department, e.to_string());
                continue;
            }
        };

        for raw in &response.relationships {
            let Some(target) = raw.target_id.as_ref().and_then(value_text) else {
                report.relationships_rejected += 1;
                continue;
            };
            if !subject_ids.contains(target.as_str()) {
                debug!("{}: unknown subject {}", requirement_id, target);
                report.relationships_rejected += 1;
                continue;
            }
            let Some(classification) = raw
                .classification
                .as_deref()
                .and_then(|c| c.parse::<Classification>().ok())
            else {
                report.relationships_rejected += 1;
                continue;
            };
            let edge = Includes {
                requirement_id: requirement_id.to_string(),
                subject_id: target,
                classification,
                sub_classification: raw
                    .sub_classification
                    .as_deref()
                    .and_then(|s| s.parse::<SubClassification>().ok()),
            };

            let edge_key = (edge.requirement_id.clone(), edge.subject_id.clone());
            match index.get(&edge_key).copied() {
                Some(pos) => edges[pos].merge(&edge),
                None => {
                    index.insert(edge_key, edges.len());
                    edges.push(edge);
                }
            }
        }
        report.record_success();
    }

    report.log_summary("Includes merge");
    (edges, report)
}
