//! Batch pipeline commands.
//!
//! Each `build-*` command folds a recorded chunk file into one JSON artifact
//! under `data/output/`. `upload` and `append` load those artifacts into the
//! graph store.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use gradkg_core::{DataPaths, Includes, Requirement, Subject, Substitutes};
use gradkg_ingest::{
    load_chunks, merge_includes, merge_requirements, merge_subjects, resolve_substitutes,
    ExtractionLog, MergeReport,
};
use gradkg_store::{GraphSnapshot, GraphStore, NewPassage, WriteSummary};

pub const SUBJECTS_FILE: &str = "subjects.json";
pub const REQUIREMENTS_FILE: &str = "requirements.json";
pub const INCLUDES_FILE: &str = "includes.json";
pub const NEW_SUBJECTS_FILE: &str = "new_subjects.json";
pub const SUBSTITUTES_FILE: &str = "substitutes.json";

/// What a command did, printed for the operator.
#[derive(Debug, Default)]
pub struct CommandReport {
    pub command: String,
    pub merge: Option<MergeReport>,
    pub written: Vec<(PathBuf, usize)>,
    pub store: Option<WriteSummary>,
    pub warnings: Vec<String>,
}

impl CommandReport {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Default::default()
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<(PathBuf, usize)> {
    let json = serde_json::to_string_pretty(items)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} items to {}", items.len(), path.display());
    Ok((path.to_path_buf(), items.len()))
}

// ---------------------------------------------------------------
// Builds
// ---------------------------------------------------------------

pub fn build_subjects(paths: &DataPaths, chunks_file: &Path) -> anyhow::Result<CommandReport> {
    let chunks = load_chunks(chunks_file)?;
    let (subjects, merge) = merge_subjects(&chunks);

    let mut report = CommandReport::new("build-subjects");
    report
        .written
        .push(write_json(&paths.output.join(SUBJECTS_FILE), &subjects)?);
    report.merge = Some(merge);
    Ok(report)
}

pub fn build_requirements(paths: &DataPaths, chunks_file: &Path) -> anyhow::Result<CommandReport> {
    let chunks = load_chunks(chunks_file)?;
    let (requirements, merge) = merge_requirements(&chunks);

    let mut report = CommandReport::new("build-requirements");
    report
        .written
        .push(write_json(&paths.output.join(REQUIREMENTS_FILE), &requirements)?);
    report.merge = Some(merge);
    Ok(report)
}

/// Needs the requirement and subject artifacts from the earlier builds.
pub fn build_includes(paths: &DataPaths, chunks_file: &Path) -> anyhow::Result<CommandReport> {
    let chunks = load_chunks(chunks_file)?;
    let requirements: Vec<Requirement> = read_json(&paths.output.join(REQUIREMENTS_FILE))?;
    let subjects: Vec<Subject> = read_json(&paths.output.join(SUBJECTS_FILE))?;

    let (includes, merge) = merge_includes(&chunks, &requirements, &subjects);

    let mut report = CommandReport::new("build-includes");
    report
        .written
        .push(write_json(&paths.output.join(INCLUDES_FILE), &includes)?);
    report.merge = Some(merge);
    Ok(report)
}

/// Resolves substitution edges against the subjects already in the store.
pub fn build_substitutes(
    paths: &DataPaths,
    store: &GraphStore,
    chunks_file: &Path,
) -> anyhow::Result<CommandReport> {
    let chunks = load_chunks(chunks_file)?;
    let known = store.list_subjects()?;
    let log = ExtractionLog::from_chunks(&chunks);
    let merged = resolve_substitutes(&log, &known);

    let mut report = CommandReport::new("build-substitutes");
    if known.is_empty() {
        report
            .warnings
            .push("Store has no subjects; run upload before build-substitutes".into());
    }
    report.written.push(write_json(
        &paths.output.join(NEW_SUBJECTS_FILE),
        &merged.new_nodes,
    )?);
    report.written.push(write_json(
        &paths.output.join(SUBSTITUTES_FILE),
        &merged.relationships,
    )?);
    report.merge = Some(merged.report);
    Ok(report)
}

// ---------------------------------------------------------------
// Store loads
// ---------------------------------------------------------------

/// Replace the stored graph with the built subjects, requirements and
/// includes.
pub fn upload(paths: &DataPaths, store: &GraphStore) -> anyhow::Result<CommandReport> {
    let snapshot = GraphSnapshot {
        subjects: read_json(&paths.output.join(SUBJECTS_FILE))?,
        requirements: read_json(&paths.output.join(REQUIREMENTS_FILE))?,
        includes: read_json::<Vec<Includes>>(&paths.output.join(INCLUDES_FILE))?,
    };
    let mut report = CommandReport::new("upload");
    report.store = Some(store.replace_graph(&snapshot)?);
    Ok(report)
}

/// Add the subjects and substitution edges found by `build-substitutes`.
pub fn append(paths: &DataPaths, store: &GraphStore) -> anyhow::Result<CommandReport> {
    let new_subjects: Vec<Subject> = read_json(&paths.output.join(NEW_SUBJECTS_FILE))?;
    let edges: Vec<Substitutes> = read_json(&paths.output.join(SUBSTITUTES_FILE))?;

    let mut report = CommandReport::new("append");
    let mut summary = store.append_subjects(&new_subjects)?;

    let names = store.subject_ids_and_names()?;
    for edge in &edges {
        for id in [&edge.source_id, &edge.target_id] {
            if !names.contains_key(id) {
                report
                    .warnings
                    .push(format!("{} -> {}: unknown subject {}", edge.source_id, edge.target_id, id));
            }
        }
    }

    let edge_summary = store.append_substitutes(&edges)?;
    summary.inserted += edge_summary.inserted;
    summary.updated += edge_summary.updated;
    summary.skipped += edge_summary.skipped;
    report.store = Some(summary);
    Ok(report)
}

/// Index pre-chunked regulation passages. Duplicate texts are skipped.
pub fn import_passages(store: &GraphStore, passages_file: &Path) -> anyhow::Result<CommandReport> {
    let passages: Vec<NewPassage> = read_json(passages_file)?;
    let mut summary = WriteSummary::default();
    for passage in &passages {
        match store.add_passage(passage)? {
            Some(_) => summary.inserted += 1,
            None => summary.skipped += 1,
        }
    }
    info!(
        "Imported {} passages ({} duplicates)",
        summary.inserted, summary.skipped
    );
    let mut report = CommandReport::new("import-passages");
    report.store = Some(summary);
    Ok(report)
}

/// Print a command report to stdout.
pub fn print_report(report: &CommandReport) {
    println!("=== gradkg {} ===", report.command);
    println!();

    if let Some(merge) = &report.merge {
        println!("Chunks:             {}/{} merged", merge.succeeded, merge.chunks_total);
        println!("Promotions:         {}", merge.promotions.len());
        println!("Nodes rejected:     {}", merge.nodes_rejected);
        println!("Known nodes:        {}", merge.nodes_skipped_known);
        println!("Edges rejected:     {}", merge.relationships_rejected);
        if !merge.failures.is_empty() {
            println!();
            println!("Failed chunks:");
            for f in &merge.failures {
                println!("  - #{} {}: {}", f.index + 1, f.department, f.reason);
            }
        }
    }

    for (path, count) in &report.written {
        println!("Wrote:              {} ({} items)", path.display(), count);
    }

    if let Some(summary) = &report.store {
        println!("Inserted:           {}", summary.inserted);
        println!("Updated:            {}", summary.updated);
        println!("Skipped:            {}", summary.skipped);
    }

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            warn!("{}", w);
            println!("  - {}", w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradkg_core::{MajorType, RequirementKey};
    use serde_json::json;

    fn write_chunks(dir: &Path, name: &str, chunks: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, chunks.to_string()).unwrap();
        path
    }

    fn meta() -> serde_json::Value {
        json!({"department": "컴퓨터공학과", "year": 2025, "track": "단일전공"})
    }

    #[test]
    fn test_pipeline_builds_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        let store = GraphStore::open(&paths.graph).unwrap();

        let subjects = write_chunks(
            dir.path(),
            "subjects.json",
            json!([
                {"metadata": meta(), "response": {"nodes": [
                    {"id": "CSE101", "name": "자료구조", "credits": 3},
                    {"id": "CSE102", "name": "운영체제", "credits": "3"}
                ]}},
                {"metadata": meta(), "response": "not json"}
            ]),
        );
        let report = build_subjects(&paths, &subjects).unwrap();
        let merge = report.merge.unwrap();
        assert_eq!(merge.succeeded, 1);
        assert_eq!(merge.failed(), 1);

        let requirements = write_chunks(
            dir.path(),
            "requirements.json",
            json!([{"metadata": meta(), "response": {"nodes": [{
                "year": 2025, "department": "컴퓨터공학과", "major_type": "단일전공",
                "total_credits": 130, "credits_major_required": 42
            }]}}]),
        );
        build_requirements(&paths, &requirements).unwrap();

        let includes = write_chunks(
            dir.path(),
            "includes.json",
            json!([{"metadata": meta(), "response": {"relationships": [
                {"target_id": "CSE101", "classification": "전공필수"},
                {"target_id": "CSE102", "classification": "전공선택"},
                {"target_id": "NOPE", "classification": "전공필수"}
            ]}}]),
        );
        let report = build_includes(&paths, &includes).unwrap();
        assert_eq!(report.merge.unwrap().relationships_rejected, 1);

        let report = upload(&paths, &store).unwrap();
        assert_eq!(report.store.unwrap().skipped, 0);

        let key = RequirementKey::new(2025, "컴퓨터공학과", MajorType::Single);
        assert_eq!(store.requirement_rows(&key).unwrap().len(), 2);
    }

    #[test]
    fn test_append_warns_on_unknown_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        let store = GraphStore::open(&paths.graph).unwrap();
        store
            .append_subjects(&[Subject::new("CSE101", "자료구조", 3)])
            .unwrap();

        write_json(
            &paths.output.join(NEW_SUBJECTS_FILE),
            &[Subject::new("OLD201", "자료구조및실습", 3)],
        )
        .unwrap();
        write_json(
            &paths.output.join(SUBSTITUTES_FILE),
            &[
                Substitutes::new("CSE101", "OLD201"),
                Substitutes::new("CSE101", "GONE999"),
            ],
        )
        .unwrap();

        let report = append(&paths, &store).unwrap();
        let summary = report.store.unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("GONE999"));
    }

    #[test]
    fn test_import_passages_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path()).unwrap();
        let file = dir.path().join("passages.json");
        let passage = json!({"text": "졸업 학점", "source": "학칙.pdf", "seq_num": 1, "year": 2025});
        std::fs::write(&file, json!([passage, passage]).to_string()).unwrap();

        let summary = import_passages(&store, &file).unwrap().store.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);
    }
}
