//! SQLite-backed curriculum graph store.
//!
//! Requirements, subjects, INCLUDES and SUBSTITUTES edges live in plain
//! tables; regulation passages are indexed with FTS5 for direct lookups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::schema::{FTS_SCHEMA_SQL, FTS_TRIGGERS_SQL, SCHEMA_SQL};
use crate::types::*;
use gradkg_core::{Error, MajorType, Requirement, RequirementKey, Result, Subject, Substitutes};

const SUBJECT_COLUMNS: &str = "id, name, aliases_json, credits, credits_note";
const REQUIREMENT_COLUMNS: &str = "id, year, department, major_type, total_credits, \
     credits_major_basic, credits_major_required, credits_major_elective, credits_industry_required";

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

/// Graph store on a single SQLite connection.
pub struct GraphStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl GraphStore {
    /// Open or create the store. The file will be `db_dir/gradkg.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir)?;
        let db_path = db_dir.join("gradkg.db");

        let conn = Connection::open(&db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        let full_schema = format!("{}\n{}\n{}", SCHEMA_SQL, FTS_SCHEMA_SQL, FTS_TRIGGERS_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let stats = store.get_stats()?;
        info!(
            "GraphStore initialized: {} requirements, {} subjects, {} passages, path={}",
            stats.requirements,
            stats.subjects,
            stats.passages,
            store.db_path.display()
        );
        Ok(store)
    }

    // ---------------------------------------------------------------
    // Graph writes
    // ---------------------------------------------------------------

    /// Drop every node and edge, then load the snapshot. Passages are kept.
    ///
    /// Includes edges whose requirement or subject is not in the snapshot
    /// are skipped.
    pub fn replace_graph(&self, snapshot: &GraphSnapshot) -> Result<WriteSummary> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute_batch(
            "DELETE FROM substitutes;
             DELETE FROM includes;
             DELETE FROM requirements;
             DELETE FROM subjects;",
        )
        .map_err(db_err)?;

        let mut summary = WriteSummary::default();
        {
            let mut insert_subject = tx
                .prepare(&format!(
                    "INSERT INTO subjects ({}) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(id) DO NOTHING",
                    SUBJECT_COLUMNS
                ))
                .map_err(db_err)?;
            for subject in &snapshot.subjects {
                let aliases = serde_json::to_string(&subject.aliases)?;
                let n = insert_subject
                    .execute(params![
                        subject.id,
                        subject.name,
                        aliases,
                        subject.credits,
                        subject.credits_note
                    ])
                    .map_err(db_err)?;
                tally(&mut summary, n);
            }

            let mut insert_requirement = tx
                .prepare(&format!(
                    "INSERT INTO requirements ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                     ON CONFLICT DO NOTHING",
                    REQUIREMENT_COLUMNS
                ))
                .map_err(db_err)?;
            for req in &snapshot.requirements {
                let req = req.clone().normalized();
                let n = insert_requirement
                    .execute(params![
                        req.id,
                        req.year,
                        req.department,
                        req.major_type.as_str(),
                        req.total_credits,
                        req.credits_major_basic,
                        req.credits_major_required,
                        req.credits_major_elective,
                        req.credits_industry_required
                    ])
                    .map_err(db_err)?;
                tally(&mut summary, n);
            }

            let mut insert_includes = tx
                .prepare(
                    "INSERT INTO includes (requirement_id, subject_id, classification, sub_classification) \
                     SELECT ?1, ?2, ?3, ?4 \
                     WHERE EXISTS (SELECT 1 FROM requirements WHERE id = ?1) \
                       AND EXISTS (SELECT 1 FROM subjects WHERE id = ?2) \
                     ON CONFLICT(requirement_id, subject_id) DO NOTHING",
                )
                .map_err(db_err)?;
            for edge in &snapshot.includes {
                let n = insert_includes
                    .execute(params![
                        edge.requirement_id,
                        edge.subject_id,
                        edge.classification.as_str(),
                        edge.sub_classification.map(|s| s.as_str())
                    ])
                    .map_err(db_err)?;
                tally(&mut summary, n);
            }
        }
        tx.commit().map_err(db_err)?;

        info!(
            "Graph replaced: {} subjects, {} requirements, {} includes ({} rows skipped)",
            snapshot.subjects.len(),
            snapshot.requirements.len(),
            snapshot.includes.len(),
            summary.skipped
        );
        Ok(summary)
    }

    /// Add subjects discovered after the initial load. New ids are created;
    /// existing ids only take the new credit value.
    pub fn append_subjects(&self, subjects: &[Subject]) -> Result<WriteSummary> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut summary = WriteSummary::default();
        {
            let mut exists = tx
                .prepare("SELECT 1 FROM subjects WHERE id = ?1")
                .map_err(db_err)?;
            let mut upsert = tx
                .prepare(&format!(
                    "INSERT INTO subjects ({}) VALUES (?1, ?2, ?3, ?4, ?5) \
                     ON CONFLICT(id) DO UPDATE SET credits = excluded.credits",
                    SUBJECT_COLUMNS
                ))
                .map_err(db_err)?;
            for subject in subjects {
                let existed = exists
                    .query_row(params![subject.id], |_| Ok(()))
                    .optional()
                    .map_err(db_err)?
                    .is_some();
                let aliases = serde_json::to_string(&subject.aliases)?;
                upsert
                    .execute(params![
                        subject.id,
                        subject.name,
                        aliases,
                        subject.credits,
                        subject.credits_note
                    ])
                    .map_err(db_err)?;
                if existed {
                    summary.updated += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("append_subjects: {:?}", summary);
        Ok(summary)
    }

    /// Add substitution edges keyed by (source_id, target_id). Existing
    /// edges are left untouched; edges whose endpoints are unknown are
    /// skipped.
    pub fn append_substitutes(&self, edges: &[Substitutes]) -> Result<WriteSummary> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let mut summary = WriteSummary::default();
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO substitutes (source_id, target_id, department, year, note) \
                     SELECT ?1, ?2, ?3, ?4, ?5 \
                     WHERE EXISTS (SELECT 1 FROM subjects WHERE id = ?1) \
                       AND EXISTS (SELECT 1 FROM subjects WHERE id = ?2) \
                     ON CONFLICT(source_id, target_id) DO NOTHING",
                )
                .map_err(db_err)?;
            for edge in edges {
                if edge.source_id == edge.target_id {
                    summary.skipped += 1;
                    continue;
                }
                let n = insert
                    .execute(params![
                        edge.source_id,
                        edge.target_id,
                        edge.department,
                        edge.year,
                        edge.note
                    ])
                    .map_err(db_err)?;
                tally(&mut summary, n);
            }
        }
        tx.commit().map_err(db_err)?;
        debug!("append_substitutes: {:?}", summary);
        Ok(summary)
    }

    // ---------------------------------------------------------------
    // Graph reads
    // ---------------------------------------------------------------

    pub fn find_requirement(&self, key: &RequirementKey) -> Result<Option<Requirement>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {} FROM requirements WHERE year = ?1 AND department = ?2 AND major_type = ?3",
                REQUIREMENT_COLUMNS
            ))
            .map_err(db_err)?;
        let requirement = stmt
            .query_row(
                params![key.year, key.department, key.major_type.as_str()],
                |row| requirement_at(row, 0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(requirement)
    }

    /// Every major subject of a requirement, left-joined with the subjects
    /// that may stand in for it.
    pub fn requirement_rows(&self, key: &RequirementKey) -> Result<Vec<RequirementRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT s.id, s.name, s.aliases_json, s.credits, s.credits_note, \
                        i.classification, i.sub_classification, \
                        t.id, t.name, t.aliases_json, t.credits, t.credits_note, \
                        x.note \
                 FROM requirements r \
                 JOIN includes i ON i.requirement_id = r.id \
                 JOIN subjects s ON s.id = i.subject_id \
                 LEFT JOIN substitutes x ON x.source_id = s.id \
                 LEFT JOIN subjects t ON t.id = x.target_id \
                 WHERE r.year = ?1 AND r.department = ?2 AND r.major_type = ?3 \
                   AND i.classification IN ('major_required', 'major_elective', 'major_basic') \
                 ORDER BY i.rowid, x.rowid",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                params![key.year, key.department, key.major_type.as_str()],
                |row| {
                    let substitute_id: Option<String> = row.get(7)?;
                    let substitute = match substitute_id {
                        Some(_) => Some(subject_at(row, 7)?),
                        None => None,
                    };
                    Ok(RequirementRow {
                        subject: subject_at(row, 0)?,
                        classification: parse_col(row, 5)?,
                        sub_classification: parse_opt_col(row, 6)?,
                        substitute,
                        substitute_note: row.get(12)?,
                    })
                },
            )
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Requirement/subject pairs of every year for one department and
    /// major type, oldest year first.
    pub fn kg_rows(&self, department: &str, major_type: MajorType) -> Result<Vec<KgRow>> {
        let conn = self.conn.lock();
        let columns = REQUIREMENT_COLUMNS
            .split(", ")
            .map(|c| format!("r.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {}, s.id, s.name, i.classification, i.sub_classification \
                 FROM requirements r \
                 JOIN includes i ON i.requirement_id = r.id \
                 JOIN subjects s ON s.id = i.subject_id \
                 WHERE r.department = ?1 AND r.major_type = ?2 \
                 ORDER BY r.year ASC, i.rowid",
                columns
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![department, major_type.as_str()], |row| {
                Ok(KgRow {
                    requirement: requirement_at(row, 0)?,
                    subject_id: row.get(9)?,
                    subject_name: row.get(10)?,
                    classification: parse_col(row, 11)?,
                    sub_classification: parse_opt_col(row, 12)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    pub fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&format!("SELECT {} FROM subjects WHERE id = ?1", SUBJECT_COLUMNS))
            .map_err(db_err)?;
        let subject = stmt
            .query_row(params![id], |row| subject_at(row, 0))
            .optional()
            .map_err(db_err)?;
        Ok(subject)
    }

    pub fn list_subjects(&self) -> Result<Vec<Subject>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&format!("SELECT {} FROM subjects ORDER BY id", SUBJECT_COLUMNS))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| subject_at(row, 0))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Subject id to name, for resolving extracted edges against the store.
    pub fn subject_ids_and_names(&self) -> Result<HashMap<String, String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT id, name FROM subjects")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<HashMap<_, _>>>().map_err(db_err)
    }

    /// All substitution edges with display names resolved.
    pub fn all_substitutes(&self) -> Result<Vec<Substitutes>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT x.source_id, x.target_id, x.department, x.year, x.note, s.name, t.name \
                 FROM substitutes x \
                 JOIN subjects s ON s.id = x.source_id \
                 JOIN subjects t ON t.id = x.target_id \
                 ORDER BY x.rowid",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                let mut edge = Substitutes::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?);
                edge.department = row.get(2)?;
                edge.year = row.get(3)?;
                edge.note = row.get(4)?;
                edge.source_name = row.get(5)?;
                edge.target_name = row.get(6)?;
                Ok(edge)
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Passages
    // ---------------------------------------------------------------

    /// Index a passage. Returns `None` when the same text is already stored.
    pub fn add_passage(&self, passage: &NewPassage) -> Result<Option<i64>> {
        let now = chrono::Utc::now().timestamp_millis();
        let hash = content_hash(&passage.text);
        let meta_json = passage
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock();
        let n = conn
            .prepare_cached(
                "INSERT INTO passages (text, source, seq_num, year, department, metadata_json, content_hash, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                 ON CONFLICT(content_hash) DO NOTHING",
            )
            .map_err(db_err)?
            .execute(params![
                passage.text,
                passage.source,
                passage.seq_num,
                passage.year,
                passage.department,
                meta_json,
                hash,
                now
            ])
            .map_err(db_err)?;
        if n == 0 {
            debug!("Duplicate passage skipped: {} #{}", passage.source, passage.seq_num);
            return Ok(None);
        }
        Ok(Some(conn.last_insert_rowid()))
    }

    /// Full-text search restricted to one year and a set of departments.
    pub fn search_passages(
        &self,
        query: &str,
        filter: &PassageFilter,
        top_k: usize,
    ) -> Result<Vec<PassageHit>> {
        let fts_query = sanitize_fts_query(query);
        if fts_query.is_empty() || filter.departments.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..filter.departments.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT p.id, p.text, p.source, p.seq_num, p.year, p.department, passages_fts.rank \
             FROM passages_fts \
             JOIN passages p ON p.id = passages_fts.rowid \
             WHERE passages_fts MATCH ?1 AND p.year = ?2 AND p.department IN ({}) \
             ORDER BY passages_fts.rank \
             LIMIT ?3",
            placeholders
        );

        let limit = top_k as i64;
        let mut values: Vec<&dyn ToSql> = vec![&fts_query, &filter.year, &limit];
        for dept in &filter.departments {
            values.push(dept);
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(values.as_slice(), |row| {
                let rank: f64 = row.get(6)?;
                Ok(PassageHit {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    source: row.get(2)?,
                    seq_num: row.get(3)?,
                    year: row.get(4)?,
                    department: row.get(5)?,
                    score: -rank, // FTS5 rank is negative; negate for positive
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let count = |table: &str| -> Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(db_err)
        };
        let requirements = count("requirements")?;
        let subjects = count("subjects")?;
        let includes = count("includes")?;
        let substitutes = count("substitutes")?;
        let passages = count("passages")?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            requirements,
            subjects,
            includes,
            substitutes,
            passages,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: db_size as f64 / (1024.0 * 1024.0),
        })
    }
}

fn tally(summary: &mut WriteSummary, changed: usize) {
    if changed > 0 {
        summary.inserted += 1;
    } else {
        summary.skipped += 1;
    }
}

/// Compute SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Quote every token and join with OR so user text never trips FTS5 syntax.
fn sanitize_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" OR ")
}

// ---------------------------------------------------------------
// Row Mapping Helpers
// ---------------------------------------------------------------

fn parse_col<T: FromStr<Err = Error>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_col<T: FromStr<Err = Error>>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Read the five subject columns starting at `base`.
fn subject_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Subject> {
    let aliases: String = row.get(base + 2)?;
    Ok(Subject {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        aliases: serde_json::from_str(&aliases).unwrap_or_default(),
        credits: row.get(base + 3)?,
        credits_note: row.get(base + 4)?,
    })
}

/// Read the nine requirement columns starting at `base`.
fn requirement_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Requirement> {
    Ok(Requirement {
        id: row.get(base)?,
        year: row.get(base + 1)?,
        department: row.get(base + 2)?,
        major_type: parse_col(row, base + 3)?,
        total_credits: row.get(base + 4)?,
        credits_major_basic: row.get(base + 5)?,
        credits_major_required: row.get(base + 6)?,
        credits_major_elective: row.get(base + 7)?,
        credits_industry_required: row.get(base + 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradkg_core::{Classification, Includes};
    use tempfile::TempDir;

    fn test_store() -> (GraphStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = GraphStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn requirement(year: i32, major_type: MajorType, required: u32) -> Requirement {
        let key = RequirementKey::new(year, "CSE", major_type);
        Requirement {
            id: key.id(),
            year,
            department: "CSE".into(),
            major_type,
            total_credits: Some(130),
            credits_major_basic: Some(12),
            credits_major_required: Some(required),
            credits_major_elective: Some(27),
            credits_industry_required: None,
        }
    }

    fn includes(req: &Requirement, subject_id: &str, classification: Classification) -> Includes {
        Includes {
            requirement_id: req.id.clone(),
            subject_id: subject_id.into(),
            classification,
            sub_classification: None,
        }
    }

    fn seed(store: &GraphStore) -> Requirement {
        let req = requirement(2025, MajorType::Single, 42);
        let mut ds = Subject::new("CSE101", "자료구조", 3);
        ds.aliases.push("자료구조론".into());
        let snapshot = GraphSnapshot {
            subjects: vec![
                ds,
                Subject::new("CSE102", "운영체제", 3),
                Subject::new("OLD201", "자료구조및실습", 3),
            ],
            requirements: vec![req.clone()],
            includes: vec![
                includes(&req, "CSE101", Classification::MajorRequired),
                includes(&req, "CSE102", Classification::MajorElective),
                includes(&req, "MISSING", Classification::MajorBasic),
            ],
        };
        let summary = store.replace_graph(&snapshot).unwrap();
        assert_eq!(summary.inserted, 6);
        assert_eq!(summary.skipped, 1);
        req
    }

    #[test]
    fn test_find_requirement() {
        let (store, _dir) = test_store();
        let req = seed(&store);

        let found = store.find_requirement(&req.key()).unwrap().unwrap();
        assert_eq!(found, req);

        let missing = RequirementKey::new(2019, "CSE", MajorType::Single);
        assert!(store.find_requirement(&missing).unwrap().is_none());
    }

    #[test]
    fn test_replace_graph_nulls_total_credits_for_minor() {
        let (store, _dir) = test_store();
        let minor = requirement(2025, MajorType::Minor, 21);
        store
            .replace_graph(&GraphSnapshot {
                requirements: vec![minor.clone()],
                ..Default::default()
            })
            .unwrap();
        let found = store.find_requirement(&minor.key()).unwrap().unwrap();
        assert_eq!(found.total_credits, None);
    }

    #[test]
    fn test_requirement_rows_left_join() {
        let (store, _dir) = test_store();
        let req = seed(&store);

        let rows = store.requirement_rows(&req.key()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.substitute.is_none()));

        let mut edge = Substitutes::new("CSE101", "OLD201");
        edge.note = Some("2023 개편".into());
        store.append_substitutes(&[edge]).unwrap();

        let rows = store.requirement_rows(&req.key()).unwrap();
        assert_eq!(rows.len(), 2);
        let ds = rows.iter().find(|r| r.subject.id == "CSE101").unwrap();
        assert_eq!(ds.subject.aliases, vec!["자료구조론".to_string()]);
        assert_eq!(ds.substitute.as_ref().unwrap().name, "자료구조및실습");
        assert_eq!(ds.substitute_note.as_deref(), Some("2023 개편"));
    }

    #[test]
    fn test_append_subjects_updates_credits_only() {
        let (store, _dir) = test_store();
        seed(&store);

        let mut renamed = Subject::new("CSE102", "새이름", 4);
        renamed.credits_note = Some("note".into());
        let summary = store
            .append_subjects(&[renamed, Subject::new("NEW100", "신규과목", 2)])
            .unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);

        let os = store.get_subject("CSE102").unwrap().unwrap();
        assert_eq!(os.name, "운영체제");
        assert_eq!(os.credits, 4);
        assert!(os.credits_note.is_none());
        assert!(store.get_subject("NEW100").unwrap().is_some());

        let names = store.subject_ids_and_names().unwrap();
        assert_eq!(names.len(), 4);
        assert_eq!(names["CSE102"], "운영체제");
    }

    #[test]
    fn test_append_substitutes_skips_unknown_and_duplicates() {
        let (store, _dir) = test_store();
        seed(&store);

        let summary = store
            .append_substitutes(&[
                Substitutes::new("CSE101", "OLD201"),
                Substitutes::new("CSE101", "OLD201"),
                Substitutes::new("CSE101", "NOPE"),
                Substitutes::new("CSE101", "CSE101"),
            ])
            .unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 3);

        let edges = store.all_substitutes().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_name.as_deref(), Some("자료구조"));
        assert_eq!(edges[0].target_name.as_deref(), Some("자료구조및실습"));
    }

    #[test]
    fn test_kg_rows_ordered_by_year() {
        let (store, _dir) = test_store();
        let newer = requirement(2025, MajorType::Single, 42);
        let older = requirement(2020, MajorType::Single, 36);
        store
            .replace_graph(&GraphSnapshot {
                subjects: vec![Subject::new("CSE101", "자료구조", 3)],
                requirements: vec![newer.clone(), older.clone()],
                includes: vec![
                    includes(&newer, "CSE101", Classification::MajorRequired),
                    includes(&older, "CSE101", Classification::MajorElective),
                ],
            })
            .unwrap();

        let rows = store.kg_rows("CSE", MajorType::Single).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].requirement.year, 2020);
        assert_eq!(rows[0].classification, Classification::MajorElective);
        assert_eq!(rows[1].requirement.year, 2025);
        assert!(store.kg_rows("CSE", MajorType::Minor).unwrap().is_empty());
    }

    #[test]
    fn test_passage_search_filters_year_and_department() {
        let (store, _dir) = test_store();
        let passage = |text: &str, seq: i64, year: i32, dept: &str| NewPassage {
            text: text.into(),
            source: "handbook.pdf".into(),
            seq_num: seq,
            year: Some(year),
            department: Some(dept.into()),
            metadata: None,
        };

        assert!(store.add_passage(&passage("졸업 논문 제출 기한", 1, 2025, "CSE")).unwrap().is_some());
        assert!(store.add_passage(&passage("졸업 논문 제출 기한", 2, 2025, "CSE")).unwrap().is_none());
        store.add_passage(&passage("졸업 학점 130", 3, 2024, "CSE")).unwrap();
        store.add_passage(&passage("졸업 인증 영어", 4, 2025, "공통")).unwrap();

        let filter = PassageFilter {
            year: 2025,
            departments: vec!["CSE".into(), "공통".into()],
        };
        let hits = store.search_passages("졸업", &filter, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.year == Some(2025)));

        let only_cse = PassageFilter {
            year: 2025,
            departments: vec!["CSE".into()],
        };
        let hits = store.search_passages("논문", &only_cse, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].seq_num, 1);

        assert!(store.search_passages("  ", &filter, 10).unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = test_store();
        seed(&store);
        let stats = store.get_stats().unwrap();
        assert_eq!(stats.requirements, 1);
        assert_eq!(stats.subjects, 3);
        assert_eq!(stats.includes, 2);
        assert_eq!(stats.substitutes, 0);
        assert_eq!(stats.passages, 0);
    }
}
