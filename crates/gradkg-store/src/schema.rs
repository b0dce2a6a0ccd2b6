//! Database schema SQL for the curriculum graph.

/// Graph tables: requirements, subjects and the two edge kinds.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS requirements (
    id TEXT PRIMARY KEY,
    year INTEGER NOT NULL,
    department TEXT NOT NULL,
    major_type TEXT NOT NULL,
    total_credits INTEGER,
    credits_major_basic INTEGER,
    credits_major_required INTEGER,
    credits_major_elective INTEGER,
    credits_industry_required INTEGER,
    UNIQUE (year, department, major_type)
);

CREATE TABLE IF NOT EXISTS subjects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    aliases_json TEXT NOT NULL DEFAULT '[]',
    credits INTEGER NOT NULL DEFAULT 0,
    credits_note TEXT
);

CREATE TABLE IF NOT EXISTS includes (
    requirement_id TEXT NOT NULL REFERENCES requirements(id) ON DELETE CASCADE,
    subject_id TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    classification TEXT NOT NULL,
    sub_classification TEXT,
    PRIMARY KEY (requirement_id, subject_id)
);

CREATE TABLE IF NOT EXISTS substitutes (
    source_id TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
    department TEXT NOT NULL DEFAULT '',
    year INTEGER,
    note TEXT,
    PRIMARY KEY (source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE INDEX IF NOT EXISTS idx_requirements_dept ON requirements(department, major_type);
CREATE INDEX IF NOT EXISTS idx_includes_subject ON includes(subject_id);
CREATE INDEX IF NOT EXISTS idx_substitutes_target ON substitutes(target_id);

CREATE TABLE IF NOT EXISTS passages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    source TEXT NOT NULL,
    seq_num INTEGER NOT NULL,
    year INTEGER,
    department TEXT,
    metadata_json TEXT,
    content_hash TEXT UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_passages_filter ON passages(year, department);
"#;

/// FTS5 index over passage text.
pub const FTS_SCHEMA_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS passages_fts USING fts5(
    text,
    content='passages', content_rowid='id',
    tokenize='unicode61'
);
"#;

/// Triggers to keep the FTS index in sync with the passages table.
pub const FTS_TRIGGERS_SQL: &str = r#"
CREATE TRIGGER IF NOT EXISTS passages_ai AFTER INSERT ON passages BEGIN
    INSERT INTO passages_fts(rowid, text) VALUES (new.id, new.text);
END;

CREATE TRIGGER IF NOT EXISTS passages_ad AFTER DELETE ON passages BEGIN
    INSERT INTO passages_fts(passages_fts, rowid, text) VALUES ('delete', old.id, old.text);
END;
"#;
