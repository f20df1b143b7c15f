//! SQLite-based mission store.

use super::{
    format_timestamp, Mission, MissionFilter, MissionStore, MissionStoreError, NewMission,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS missions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    description TEXT NOT NULL,
    launch_date TEXT
);

CREATE INDEX IF NOT EXISTS idx_missions_launch_date ON missions(launch_date);
"#;

const MISSION_COLUMNS: &str = "id, name, status, description, launch_date";

pub struct SqliteMissionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMissionStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, MissionStoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MissionStoreError::Backend(format!("Failed to create database dir: {}", e))
            })?;
        }

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(|e| {
                MissionStoreError::Backend(format!("Failed to open SQLite database: {}", e))
            })?;

            conn.execute_batch(SCHEMA).map_err(|e| {
                MissionStoreError::Backend(format!("Failed to run schema: {}", e))
            })?;

            tracing::debug!("Opened mission database at {}", db_path.display());
            Ok::<_, MissionStoreError>(conn)
        })
        .await
        .map_err(|e| MissionStoreError::Backend(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, MissionStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, MissionStoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| MissionStoreError::Backend(format!("Task join error: {}", e)))?
    }
}

fn backend_error(e: rusqlite::Error) -> MissionStoreError {
    MissionStoreError::Backend(e.to_string())
}

/// Map a write error, recognising UNIQUE violations on `name`.
fn write_error(e: rusqlite::Error, name: &str) -> MissionStoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return MissionStoreError::Duplicate(name.to_string());
        }
    }
    backend_error(e)
}

/// SQLite reads a negative LIMIT as unbounded and a negative OFFSET as zero,
/// so counts past `i64::MAX` are clamped instead of wrapped.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn row_to_mission(row: &Row<'_>) -> rusqlite::Result<Mission> {
    let launch_date: Option<String> = row.get(4)?;
    Ok(Mission {
        id: row.get(0)?,
        name: row.get(1)?,
        status: row.get(2)?,
        description: row.get(3)?,
        launch_date: launch_date.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
        }),
    })
}

/// Build the WHERE clause and its positional parameters for a filter.
fn filter_clause(filter: &MissionFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if filter.start_date.is_some() || filter.end_date.is_some() {
        clauses.push("launch_date IS NOT NULL".to_string());
    }
    if let Some(start) = &filter.start_date {
        values.push(Value::Text(format_timestamp(start)));
        clauses.push(format!("launch_date >= ?{}", values.len()));
    }
    if let Some(end) = &filter.end_date {
        values.push(Value::Text(format_timestamp(end)));
        clauses.push(format!("launch_date <= ?{}", values.len()));
    }
    if let Some(keyword) = &filter.keyword {
        values.push(Value::Text(keyword.to_lowercase()));
        let n = values.len();
        // instr() instead of LIKE so '%' and '_' in keywords match literally.
        clauses.push(format!(
            "(instr(lower(name), ?{n}) > 0 OR instr(lower(description), ?{n}) > 0)"
        ));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

#[async_trait]
impl MissionStore for SqliteMissionStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn create_mission(&self, mission: &NewMission) -> Result<Mission, MissionStoreError> {
        let m = mission.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO missions (name, status, description, launch_date)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {MISSION_COLUMNS}"
                ),
                params![
                    m.name,
                    m.status,
                    m.description,
                    m.launch_date.as_ref().map(format_timestamp),
                ],
                row_to_mission,
            )
            .map_err(|e| write_error(e, &m.name))
        })
        .await
    }

    async fn list_missions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mission>, MissionStoreError> {
        self.list_filtered(&MissionFilter::default(), limit, offset)
            .await
    }

    async fn list_filtered(
        &self,
        filter: &MissionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mission>, MissionStoreError> {
        let (where_clause, mut values) = filter_clause(filter);
        values.push(Value::Integer(sql_count(limit)));
        let limit_idx = values.len();
        values.push(Value::Integer(sql_count(offset)));
        let offset_idx = values.len();

        let sql = format!(
            "SELECT {MISSION_COLUMNS} FROM missions {where_clause}
             ORDER BY id ASC
             LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(backend_error)?;
            let missions = stmt
                .query_map(params_from_iter(values), row_to_mission)
                .map_err(backend_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(backend_error)?;
            Ok(missions)
        })
        .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Mission>, MissionStoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {MISSION_COLUMNS} FROM missions WHERE name = ?1"),
                params![name],
                row_to_mission,
            )
            .optional()
            .map_err(backend_error)
        })
        .await
    }

    async fn upsert_by_name(&self, mission: &NewMission) -> Result<Mission, MissionStoreError> {
        let m = mission.clone();
        self.with_conn(move |conn| {
            // Single statement so concurrent passes resolve as last-writer-wins.
            conn.query_row(
                &format!(
                    "INSERT INTO missions (name, status, description, launch_date)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(name) DO UPDATE SET
                         status = excluded.status,
                         description = excluded.description,
                         launch_date = COALESCE(excluded.launch_date, missions.launch_date)
                     RETURNING {MISSION_COLUMNS}"
                ),
                params![
                    m.name,
                    m.status,
                    m.description,
                    m.launch_date.as_ref().map(format_timestamp),
                ],
                row_to_mission,
            )
            .map_err(|e| write_error(e, &m.name))
        })
        .await
    }
}
