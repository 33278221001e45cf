//! SQLite-backed state store for deployment records.
//!
//! The store wraps a single `rusqlite` connection behind a mutex: SQLite
//! does not support concurrent writers, so serializing every statement on
//! one connection sidesteps "database is locked" errors entirely. All
//! public methods hop through `spawn_blocking` so SQLite I/O never stalls
//! the async executor.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::errors::CorvusError;
use crate::models::{Deployment, DeploymentStatus, SourceSpec};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deployments (
    id               TEXT PRIMARY KEY,
    slug             TEXT UNIQUE NOT NULL,
    name             TEXT NOT NULL,
    source_type      TEXT NOT NULL,
    github_url       TEXT,
    branch           TEXT,
    build_command    TEXT NOT NULL DEFAULT '',
    output_directory TEXT NOT NULL DEFAULT '.',
    env_vars         TEXT,
    status           TEXT NOT NULL,
    url              TEXT NOT NULL,
    webhook_secret   TEXT NOT NULL,
    auto_deploy      INTEGER NOT NULL DEFAULT 0,
    expires_at       TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
";

const COLUMNS: &str = "id, slug, name, source_type, github_url, branch, \
     build_command, output_directory, env_vars, status, url, \
     webhook_secret, auto_deploy, expires_at, created_at, updated_at";

/// Handle to the deployments table. Cheap to clone; all clones share the
/// same serialized connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `db_path` and run the schema
    /// migration. The parent directory is created if missing. The
    /// migration uses IF NOT EXISTS so it is safe on every startup.
    pub fn open(db_path: &Path) -> Result<Self, CorvusError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| CorvusError::Store(format!("failed to open database: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| CorvusError::Store(format!("schema migration failed: {e}")))?;

        info!(path = %db_path.display(), "database opened and schema migrated");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a new deployment row. Creation and update timestamps are
    /// populated here so every row is stamped consistently; the caller's
    /// value is updated in place. A slug-uniqueness violation maps to
    /// `Conflict`.
    pub async fn insert(&self, deployment: &mut Deployment) -> Result<(), CorvusError> {
        let now = Utc::now();
        deployment.created_at = now;
        deployment.updated_at = now;

        let row = deployment.clone();
        self.with_conn(move |conn| {
            let (github_url, branch) = match &row.source {
                SourceSpec::Zip => (None, None),
                SourceSpec::GitHub { url, branch } => (Some(url.as_str()), Some(branch.as_str())),
            };

            conn.execute(
                "INSERT INTO deployments (
                    id, slug, name, source_type, github_url, branch,
                    build_command, output_directory, env_vars, status, url,
                    webhook_secret, auto_deploy, expires_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    row.id,
                    row.slug,
                    row.name,
                    row.source.kind(),
                    github_url,
                    branch,
                    row.build_command,
                    row.output_directory,
                    row.env_vars,
                    row.status.as_str(),
                    row.url,
                    row.webhook_secret,
                    row.auto_deploy,
                    row.expires_at,
                    row.created_at,
                    row.updated_at,
                ],
            )
            .map_err(|e| map_insert_error(&row.slug, e))?;
            Ok(())
        })
        .await
    }

    /// Fetch a single deployment by id. `NotFound` when no row matches.
    pub async fn get(&self, id: &str) -> Result<Deployment, CorvusError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let query = format!("SELECT {COLUMNS} FROM deployments WHERE id = ?1");
            conn.query_row(&query, params![id], row_to_deployment)
                .optional()
                .map_err(store_error)?
                .ok_or_else(|| CorvusError::NotFound(format!("deployment {id} not found")))
        })
        .await
    }

    /// All deployments, newest first. An empty table yields an empty vec.
    pub async fn list(&self) -> Result<Vec<Deployment>, CorvusError> {
        self.with_conn(move |conn| {
            let query = format!("SELECT {COLUMNS} FROM deployments ORDER BY created_at DESC");
            let mut stmt = conn.prepare(&query).map_err(store_error)?;
            let rows = stmt
                .query_map([], row_to_deployment)
                .map_err(store_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(store_error)?;
            Ok(rows)
        })
        .await
    }

    /// Update the status column, refreshing updated_at. `NotFound` when no
    /// row matched, preventing silent no-ops.
    pub async fn update_status(
        &self,
        id: &str,
        status: DeploymentStatus,
    ) -> Result<(), CorvusError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let affected = conn
                .execute(
                    "UPDATE deployments SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status.as_str(), Utc::now(), id],
                )
                .map_err(store_error)?;
            if affected == 0 {
                return Err(CorvusError::NotFound(format!("deployment {id} not found")));
            }
            Ok(())
        })
        .await
    }

    /// Update the public URL column, refreshing updated_at. Same contract
    /// as `update_status`.
    pub async fn update_url(&self, id: &str, url: &str) -> Result<(), CorvusError> {
        let id = id.to_string();
        let url = url.to_string();
        self.with_conn(move |conn| {
            let affected = conn
                .execute(
                    "UPDATE deployments SET url = ?1, updated_at = ?2 WHERE id = ?3",
                    params![url, Utc::now(), id],
                )
                .map_err(store_error)?;
            if affected == 0 {
                return Err(CorvusError::NotFound(format!("deployment {id} not found")));
            }
            Ok(())
        })
        .await
    }

    /// Delete a deployment row. `NotFound` when no row matched. The caller
    /// is responsible for container and file teardown before this; the row
    /// is always the last thing removed.
    pub async fn delete(&self, id: &str) -> Result<(), CorvusError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let affected = conn
                .execute("DELETE FROM deployments WHERE id = ?1", params![id])
                .map_err(store_error)?;
            if affected == 0 {
                return Err(CorvusError::NotFound(format!("deployment {id} not found")));
            }
            Ok(())
        })
        .await
    }

    /// Live deployments whose expiration has passed. Rows in any other
    /// status are never eligible for reaping.
    pub async fn list_expired_live(&self) -> Result<Vec<Deployment>, CorvusError> {
        self.with_conn(move |conn| {
            let query = format!(
                "SELECT {COLUMNS} FROM deployments \
                 WHERE expires_at IS NOT NULL AND expires_at <= ?1 AND status = 'live'"
            );
            let mut stmt = conn.prepare(&query).map_err(store_error)?;
            let rows = stmt
                .query_map(params![Utc::now()], row_to_deployment)
                .map_err(store_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(store_error)?;
            Ok(rows)
        })
        .await
    }

    /// Live deployments, for the startup reconciliation pass.
    pub async fn list_live(&self) -> Result<Vec<Deployment>, CorvusError> {
        self.with_conn(move |conn| {
            let query = format!("SELECT {COLUMNS} FROM deployments WHERE status = 'live'");
            let mut stmt = conn.prepare(&query).map_err(store_error)?;
            let rows = stmt
                .query_map([], row_to_deployment)
                .map_err(store_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(store_error)?;
            Ok(rows)
        })
        .await
    }

    async fn with_conn<T, F>(&self, work: F) -> Result<T, CorvusError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CorvusError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| CorvusError::Store("connection lock poisoned".to_string()))?;
            work(&guard)
        })
        .await
        .map_err(|e| CorvusError::Store(format!("store task join failed: {e}")))?
    }
}

fn store_error(err: rusqlite::Error) -> CorvusError {
    CorvusError::Store(err.to_string())
}

fn map_insert_error(slug: &str, err: rusqlite::Error) -> CorvusError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return CorvusError::Conflict(format!("slug {slug:?} already exists"));
        }
    }
    store_error(err)
}

fn row_to_deployment(row: &Row<'_>) -> rusqlite::Result<Deployment> {
    let source_type: String = row.get("source_type")?;
    let github_url: Option<String> = row.get("github_url")?;
    let branch: Option<String> = row.get("branch")?;

    let source = match source_type.as_str() {
        "zip" => SourceSpec::Zip,
        "github" => SourceSpec::GitHub {
            url: github_url.unwrap_or_default(),
            branch: branch.unwrap_or_else(crate::models::deployment::default_branch),
        },
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown source type: {other}").into(),
            ))
        }
    };

    let status_text: String = row.get("status")?;
    let status = DeploymentStatus::from_str(&status_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
    })?;

    let expires_at: Option<DateTime<Utc>> = row.get("expires_at")?;
    let created_at: DateTime<Utc> = row.get("created_at")?;
    let updated_at: DateTime<Utc> = row.get("updated_at")?;

    Ok(Deployment {
        id: row.get("id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        source,
        build_command: row.get("build_command")?,
        output_directory: row.get("output_directory")?,
        env_vars: row.get("env_vars")?,
        status,
        url: row.get("url")?,
        webhook_secret: row.get("webhook_secret")?,
        auto_deploy: row.get("auto_deploy")?,
        expires_at,
        created_at,
        updated_at,
    })
}
