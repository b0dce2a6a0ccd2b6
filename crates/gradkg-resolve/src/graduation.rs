//! Graduation credit reconciliation.
//!
//! A subject counts as taken when the student lists its name, one of its
//! aliases, or the name or an alias of any subject that may substitute for
//! it. Matching is exact on trimmed names; unknown names are ignored.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::types::*;
use gradkg_core::{Classification, CreditCategory, Requirement, Result, SubClassification, Subject};
use gradkg_store::{GraphStore, RequirementRow};

/// Everything the joined rows say about one included subject.
struct SubjectState<'a> {
    subject: &'a Subject,
    classification: Classification,
    industry: bool,
    satisfied: bool,
    alternatives: Vec<&'a str>,
    note: Option<&'a str>,
}

/// Reconcile taken courses against a requirement and its joined rows.
///
/// `requirement` is `None` when the curriculum has no entry for the query;
/// every category then requires zero credits.
pub fn reconcile(
    requirement: Option<&Requirement>,
    rows: &[RequirementRow],
    taken: &[String],
) -> GraduationReport {
    let taken: HashSet<&str> = taken
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    let mut states: Vec<SubjectState<'_>> = Vec::new();
    let mut by_id: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        let pos = *by_id.entry(row.subject.id.as_str()).or_insert_with(|| {
            states.push(SubjectState {
                subject: &row.subject,
                classification: row.classification,
                industry: false,
                satisfied: false,
                alternatives: Vec::new(),
                note: None,
            });
            states.len() - 1
        });
        let state = &mut states[pos];
        state.industry |= row.sub_classification == Some(SubClassification::IndustryRequired);

        let mut matched = row.subject.known_names().any(|n| taken.contains(n));
        if let Some(sub) = &row.substitute {
            matched |= sub.known_names().any(|n| taken.contains(n));
            if !state.alternatives.contains(&sub.name.as_str()) {
                state.alternatives.push(&sub.name);
            }
            if state.note.is_none() {
                state.note = row.substitute_note.as_deref().filter(|n| !n.trim().is_empty());
            }
        }
        state.satisfied |= matched;
    }

    let mut earned: BTreeMap<CreditCategory, u32> = BTreeMap::new();
    let mut counted: HashSet<&str> = HashSet::new();
    let mut pending: BTreeMap<CreditCategory, Vec<PendingMissing<'_>>> = BTreeMap::new();
    let mut missing_index: HashMap<(CreditCategory, &str), usize> = HashMap::new();

    for state in &states {
        let name = state.subject.name.as_str();
        let category = CreditCategory::from(state.classification);

        if state.satisfied {
            if counted.insert(name) {
                add_credits(&mut earned, category, state.subject.credits);
                if state.industry {
                    add_credits(&mut earned, CreditCategory::IndustryRequired, state.subject.credits);
                }
            }
            continue;
        }
        if !state.classification.reports_missing() {
            continue;
        }

        let entries = pending.entry(category).or_default();
        match missing_index.get(&(category, name)).copied() {
            Some(pos) => {
                let entry = &mut entries[pos];
                for alt in &state.alternatives {
                    if !entry.alternatives.contains(alt) {
                        entry.alternatives.push(*alt);
                    }
                }
                if entry.note.is_none() {
                    entry.note = state.note;
                }
            }
            None => {
                missing_index.insert((category, name), entries.len());
                entries.push(PendingMissing {
                    subject: state.subject,
                    alternatives: state.alternatives.clone(),
                    note: state.note,
                });
            }
        }
    }

    let missing = pending
        .into_iter()
        .map(|(category, entries)| {
            let entries = entries
                .into_iter()
                .map(|e| MissingSubject {
                    name: e.subject.name.clone(),
                    credits: e.subject.credits,
                    alternatives: join_alternatives(&e.alternatives),
                    note: e.note.unwrap_or_default().to_string(),
                })
                .collect();
            (category, entries)
        })
        .collect();

    let credit_status = CreditCategory::ALL
        .iter()
        .map(|&category| {
            let required = requirement.map(|r| r.required_credits(category)).unwrap_or(0);
            let got = earned.get(&category).copied().unwrap_or(0);
            (category, CreditStatus::new(required, got))
        })
        .collect();

    GraduationReport {
        requirement_summary: requirement.cloned(),
        missing_by_category: missing,
        credit_status,
    }
}

/// A missing subject before its alternatives are joined for output.
struct PendingMissing<'a> {
    subject: &'a Subject,
    alternatives: Vec<&'a str>,
    note: Option<&'a str>,
}

fn add_credits(earned: &mut BTreeMap<CreditCategory, u32>, category: CreditCategory, credits: u32) {
    let total = earned.entry(category).or_default();
    *total = total.saturating_add(credits);
}

const NO_ALTERNATIVES: &str = "none";

fn join_alternatives(names: &[&str]) -> String {
    if names.is_empty() {
        NO_ALTERNATIVES.to_string()
    } else {
        names.join(", ")
    }
}

/// Split the free-text course box: commas and line breaks separate names.
pub fn parse_taken_courses(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}

/// Store-backed graduation check.
pub struct GraduationResolver;

impl GraduationResolver {
    pub fn check(store: &GraphStore, query: &GraduationQuery) -> Result<GraduationReport> {
        let key = query.key();
        let requirement = store.find_requirement(&key)?;
        if requirement.is_none() {
            debug!("No requirement for {}", key.id());
        }
        let rows = store.requirement_rows(&key)?;
        Ok(reconcile(requirement.as_ref(), &rows, &query.taken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradkg_core::{Includes, MajorType, RequirementKey, Substitutes};
    use gradkg_store::GraphSnapshot;

    fn requirement() -> Requirement {
        let key = RequirementKey::new(2025, "CSE", MajorType::Single);
        Requirement {
            id: key.id(),
            year: 2025,
            department: "CSE".into(),
            major_type: MajorType::Single,
            total_credits: Some(130),
            credits_major_basic: Some(6),
            credits_major_required: Some(42),
            credits_major_elective: Some(24),
            credits_industry_required: Some(3),
        }
    }

    fn data_structures() -> Subject {
        let mut s = Subject::new("CSE101", "자료구조", 3);
        s.aliases.push("자료구조론".into());
        s
    }

    fn row(subject: Subject, classification: Classification) -> RequirementRow {
        RequirementRow {
            subject,
            classification,
            sub_classification: None,
            substitute: None,
            substitute_note: None,
        }
    }

    fn with_substitute(mut r: RequirementRow, sub: Subject, note: Option<&str>) -> RequirementRow {
        r.substitute = Some(sub);
        r.substitute_note = note.map(str::to_string);
        r
    }

    fn taken(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alias_match_earns_credits() {
        let req = requirement();
        let rows = vec![row(data_structures(), Classification::MajorRequired)];
        let report = reconcile(Some(&req), &rows, &taken(&["자료구조론"]));

        let status = report.credit_status[&CreditCategory::MajorRequired];
        assert_eq!(status, CreditStatus { required: 42, earned: 3, remaining: 39 });
        assert!(!report.missing_by_category.contains_key(&CreditCategory::MajorRequired));
        assert_eq!(report.credit_status.len(), 4);
    }

    #[test]
    fn test_untaken_required_subject_is_missing() {
        let req = requirement();
        let rows = vec![row(data_structures(), Classification::MajorRequired)];
        let report = reconcile(Some(&req), &rows, &[]);

        assert_eq!(
            report.missing_by_category[&CreditCategory::MajorRequired],
            vec![MissingSubject {
                name: "자료구조".into(),
                credits: 3,
                alternatives: "none".into(),
                note: String::new(),
            }]
        );
        assert_eq!(report.credit_status[&CreditCategory::MajorRequired].remaining, 42);
    }

    #[test]
    fn test_all_match_sources_count_the_same() {
        let req = requirement();
        let mut old = Subject::new("OLD201", "자료구조및실습", 3);
        old.aliases.push("자료구조실습".into());
        let rows = vec![with_substitute(
            row(data_structures(), Classification::MajorRequired),
            old,
            Some("2023 개편"),
        )];

        for name in ["자료구조", "자료구조론", "자료구조및실습", "자료구조실습", "  자료구조  "] {
            let report = reconcile(Some(&req), &rows, &taken(&[name]));
            assert_eq!(
                report.credit_status[&CreditCategory::MajorRequired].earned,
                3,
                "matching through {name}"
            );
            assert_eq!(report.missing_count(), 0);
        }

        let report = reconcile(Some(&req), &rows, &taken(&["자료 구조"]));
        assert_eq!(report.credit_status[&CreditCategory::MajorRequired].earned, 0);
        let missing = &report.missing_by_category[&CreditCategory::MajorRequired][0];
        assert_eq!(missing.alternatives, "자료구조및실습");
        assert_eq!(missing.note, "2023 개편");
    }

    #[test]
    fn test_credits_counted_once_per_subject() {
        let req = requirement();
        let rows = vec![
            with_substitute(
                row(data_structures(), Classification::MajorRequired),
                Subject::new("OLD1", "구자료구조", 3),
                None,
            ),
            with_substitute(
                row(data_structures(), Classification::MajorRequired),
                Subject::new("OLD2", "자료구조기초", 3),
                None,
            ),
        ];
        let report = reconcile(
            Some(&req),
            &rows,
            &taken(&["자료구조", "구자료구조", "자료구조기초"]),
        );
        assert_eq!(report.credit_status[&CreditCategory::MajorRequired].earned, 3);
    }

    #[test]
    fn test_missing_merges_alternatives() {
        let req = requirement();
        let rows = vec![
            with_substitute(
                row(data_structures(), Classification::MajorBasic),
                Subject::new("OLD1", "구자료구조", 3),
                None,
            ),
            with_substitute(
                row(data_structures(), Classification::MajorBasic),
                Subject::new("OLD2", "자료구조기초", 3),
                Some("택1"),
            ),
            with_substitute(
                row(data_structures(), Classification::MajorBasic),
                Subject::new("OLD1", "구자료구조", 3),
                None,
            ),
        ];
        let report = reconcile(Some(&req), &rows, &[]);
        let missing = &report.missing_by_category[&CreditCategory::MajorBasic];
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].alternatives, "구자료구조, 자료구조기초");
        assert_eq!(missing[0].note, "택1");
    }

    #[test]
    fn test_electives_never_missing_and_industry_bucket() {
        let req = requirement();
        let mut capstone = row(Subject::new("CSE401", "캡스톤디자인", 3), Classification::MajorElective);
        capstone.sub_classification = Some(SubClassification::IndustryRequired);
        let rows = vec![
            capstone,
            row(Subject::new("CSE301", "컴파일러", 3), Classification::MajorElective),
        ];

        let report = reconcile(Some(&req), &rows, &[]);
        assert!(report.missing_by_category.is_empty());

        let report = reconcile(Some(&req), &rows, &taken(&["캡스톤디자인", "없는과목"]));
        assert_eq!(report.credit_status[&CreditCategory::MajorElective].earned, 3);
        assert_eq!(report.credit_status[&CreditCategory::IndustryRequired].earned, 3);
        assert_eq!(report.credit_status[&CreditCategory::IndustryRequired].remaining, 0);
    }

    #[test]
    fn test_remaining_never_negative() {
        let req = requirement();
        let rows = vec![
            row(Subject::new("B1", "기초1", 4), Classification::MajorBasic),
            row(Subject::new("B2", "기초2", 4), Classification::MajorBasic),
        ];
        let report = reconcile(Some(&req), &rows, &taken(&["기초1", "기초2"]));
        let status = report.credit_status[&CreditCategory::MajorBasic];
        assert_eq!(status.earned, 8);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn test_alternative_names_containing_separator() {
        let req = requirement();
        // Two codes share a name, so their alternatives merge into one entry.
        let renamed = Subject::new("CSE101A", "자료구조", 3);
        let rows = vec![
            with_substitute(
                row(data_structures(), Classification::MajorRequired),
                Subject::new("OLD1", "자료구조, 알고리즘", 3),
                None,
            ),
            with_substitute(
                row(renamed.clone(), Classification::MajorRequired),
                Subject::new("OLD1", "자료구조, 알고리즘", 3),
                None,
            ),
            with_substitute(
                row(renamed, Classification::MajorRequired),
                Subject::new("OLD2", "알고리즘", 3),
                None,
            ),
        ];
        let report = reconcile(Some(&req), &rows, &[]);
        let missing = &report.missing_by_category[&CreditCategory::MajorRequired];
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].alternatives, "자료구조, 알고리즘, 알고리즘");
    }

    #[test]
    fn test_earned_credits_saturate() {
        let req = requirement();
        let rows = vec![
            row(Subject::new("B1", "기초1", u32::MAX), Classification::MajorBasic),
            row(Subject::new("B2", "기초2", 2), Classification::MajorBasic),
        ];
        let report = reconcile(Some(&req), &rows, &taken(&["기초1", "기초2"]));
        let status = report.credit_status[&CreditCategory::MajorBasic];
        assert_eq!(status.earned, u32::MAX);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn test_missing_requirement_reports_zero() {
        let report = reconcile(None, &[], &taken(&["자료구조"]));
        assert!(report.requirement_summary.is_none());
        assert!(report.missing_by_category.is_empty());
        for category in CreditCategory::ALL {
            assert_eq!(report.credit_status[&category], CreditStatus::default());
        }
    }

    #[test]
    fn test_parse_taken_courses() {
        assert_eq!(
            parse_taken_courses("자료구조, 운영체제\n 컴파일러 ,,\n자료구조"),
            vec!["자료구조", "운영체제", "컴파일러"]
        );
        assert!(parse_taken_courses(" \n , ").is_empty());
    }

    #[test]
    fn test_check_against_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path()).unwrap();
        let req = requirement();
        store
            .replace_graph(&GraphSnapshot {
                subjects: vec![data_structures(), Subject::new("OLD201", "자료구조및실습", 3)],
                requirements: vec![req.clone()],
                includes: vec![Includes {
                    requirement_id: req.id.clone(),
                    subject_id: "CSE101".into(),
                    classification: Classification::MajorRequired,
                    sub_classification: None,
                }],
            })
            .unwrap();
        store
            .append_substitutes(&[Substitutes::new("CSE101", "OLD201")])
            .unwrap();

        let query = GraduationQuery {
            year: 2025,
            department: "CSE".into(),
            major_type: MajorType::Single,
            taken: taken(&["자료구조및실습"]),
        };
        let report = GraduationResolver::check(&store, &query).unwrap();
        assert_eq!(report.requirement_summary.as_ref().unwrap().id, req.id);
        assert_eq!(report.credit_status[&CreditCategory::MajorRequired].earned, 3);

        let other = GraduationQuery {
            year: 2019,
            ..query
        };
        let report = GraduationResolver::check(&store, &other).unwrap();
        assert!(report.requirement_summary.is_none());
        assert_eq!(report.credit_status[&CreditCategory::MajorRequired].required, 0);
    }
}
