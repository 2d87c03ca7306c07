//! libSQL storage layer for challenge and project records.
//!
//! Persistence is optional: a `collect` run only opens a [`Storage`] when a
//! database path is configured. Records are upserted so re-running a
//! challenge never duplicates rows.

mod migrations;

use std::path::Path;

use chrono::Utc;
use deliverybot_shared::{DeliveryBotError, Result};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// A stored challenge (`w1ch2` → week 1, number "2").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub id: String,
    pub name: String,
    pub week: u32,
    pub number: String,
}

/// A stored delivery for one challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    /// Folder name (student or hyphen-joined group).
    pub name: String,
    /// Identifier of the student who posted the submission.
    pub student: String,
    pub repo_urls: Vec<String>,
    pub prod_urls: Vec<String>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> DeliveryBotError {
    DeliveryBotError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DeliveryBotError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for queries only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeliveryBotError::Storage(format!(
                "database {} does not exist",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DeliveryBotError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DeliveryBotError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Challenge operations
    // -----------------------------------------------------------------------

    /// Insert the challenge if absent and return its stored record.
    pub async fn upsert_challenge(
        &self,
        name: &str,
        week: u32,
        number: &str,
    ) -> Result<ChallengeRecord> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO challenges (id, name, week, number) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET week = excluded.week, number = excluded.number",
                params![Uuid::now_v7().to_string(), name, week, number],
            )
            .await
            .map_err(storage_err)?;

        self.get_challenge(name).await?.ok_or_else(|| {
            DeliveryBotError::Storage(format!("challenge {name} missing after upsert"))
        })
    }

    /// Get a challenge by its code name.
    pub async fn get_challenge(&self, name: &str) -> Result<Option<ChallengeRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, week, number FROM challenges WHERE name = ?1",
                params![name],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(ChallengeRecord {
                id: row.get::<String>(0).map_err(storage_err)?,
                name: row.get::<String>(1).map_err(storage_err)?,
                week: row.get::<u32>(2).map_err(storage_err)?,
                number: row.get::<String>(3).map_err(storage_err)?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Project operations
    // -----------------------------------------------------------------------

    /// Upsert a project (insert or update on conflict by `challenge_id + name`).
    pub async fn upsert_project(&self, challenge_id: &str, project: &ProjectRecord) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let repo_urls = serde_json::to_string(&project.repo_urls).map_err(storage_err)?;
        let prod_urls = serde_json::to_string(&project.prod_urls).map_err(storage_err)?;

        self.conn
            .execute(
                "INSERT INTO projects (id, name, challenge_id, student, repo_urls_json, prod_urls_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(challenge_id, name) DO UPDATE SET
                   student = excluded.student,
                   repo_urls_json = excluded.repo_urls_json,
                   prod_urls_json = excluded.prod_urls_json,
                   updated_at = excluded.updated_at",
                params![
                    Uuid::now_v7().to_string(),
                    project.name.as_str(),
                    challenge_id,
                    project.student.as_str(),
                    repo_urls,
                    prod_urls,
                    now.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// List the projects of a challenge, ordered by folder name.
    pub async fn list_projects_by_challenge(&self, challenge_id: &str) -> Result<Vec<ProjectRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, student, repo_urls_json, prod_urls_json
                 FROM projects WHERE challenge_id = ?1 ORDER BY name",
                params![challenge_id],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_project(&row)?);
        }
        Ok(results)
    }
}

/// Convert a database row to a [`ProjectRecord`].
fn row_to_project(row: &libsql::Row) -> Result<ProjectRecord> {
    let decode = |idx: i32| -> Result<Vec<String>> {
        let s: String = row.get(idx).map_err(storage_err)?;
        serde_json::from_str(&s)
            .map_err(|e| DeliveryBotError::Storage(format!("invalid URL list: {e}")))
    };

    Ok(ProjectRecord {
        name: row.get::<String>(0).map_err(storage_err)?,
        student: row.get::<String>(1).map_err(storage_err)?,
        repo_urls: decode(2)?,
        prod_urls: decode(3)?,
    })
}
