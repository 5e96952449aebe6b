//! SQL migration definitions for the LeadScout history database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: runs, newsletters, leads",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per batch session
CREATE TABLE IF NOT EXISTS runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    min_score   REAL NOT NULL,
    newsletters INTEGER NOT NULL DEFAULT 0,
    leads       INTEGER NOT NULL DEFAULT 0,
    degraded    INTEGER NOT NULL DEFAULT 0,
    cancelled   INTEGER NOT NULL DEFAULT 0
);

-- Processed newsletters, keyed by content hash
CREATE TABLE IF NOT EXISTS newsletters (
    id                TEXT PRIMARY KEY,
    run_id            TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    source            TEXT NOT NULL,
    subject           TEXT NOT NULL,
    extraction_source TEXT NOT NULL,
    lead_count        INTEGER NOT NULL DEFAULT 0,
    processed_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_newsletters_run_id ON newsletters(run_id);

-- Ranked leads retained by a run
CREATE TABLE IF NOT EXISTS leads (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id          TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    newsletter_id   TEXT,
    rank            INTEGER NOT NULL,
    name            TEXT NOT NULL,
    dedup_key       TEXT NOT NULL,
    score           REAL NOT NULL,
    outreach_source TEXT NOT NULL,
    company_json    TEXT NOT NULL,
    UNIQUE(run_id, rank)
);

CREATE INDEX IF NOT EXISTS idx_leads_run_id ON leads(run_id);
CREATE INDEX IF NOT EXISTS idx_leads_dedup_key ON leads(dedup_key);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
