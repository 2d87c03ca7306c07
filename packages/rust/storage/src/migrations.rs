//! SQL migration definitions for the DeliveryBot database.
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
        description: "Initial schema: challenges, projects",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per challenge code (w1ch2, w3chwe, ...)
CREATE TABLE IF NOT EXISTS challenges (
    id     TEXT PRIMARY KEY,
    name   TEXT NOT NULL UNIQUE,
    week   INTEGER NOT NULL,
    number TEXT NOT NULL
);

-- One row per delivered submission folder
CREATE TABLE IF NOT EXISTS projects (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    challenge_id   TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
    student        TEXT NOT NULL,
    repo_urls_json TEXT NOT NULL DEFAULT '[]',
    prod_urls_json TEXT NOT NULL DEFAULT '[]',
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE(challenge_id, name)
);

CREATE INDEX IF NOT EXISTS idx_projects_challenge ON projects(challenge_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
