//! SQLite session, migrations and the process-wide connection provider.

use crate::error::AppError;
use crate::infra::config::DbCredentials;
use crate::query::{Dataset, Query, Value};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A database session able to run one parameterized statement at a time.
pub trait DbSession: Send + Sync {
    fn execute(&self, query: &Query) -> Result<Dataset, AppError>;

    /// Release the underlying handle. Later `execute` calls fail with `Connection`.
    fn close(&self) -> Result<(), AppError>;
}

pub struct SqliteSession(Mutex<Option<Connection>>);

impl SqliteSession {
    pub fn from_connection(conn: Connection) -> Self {
        Self(Mutex::new(Some(conn)))
    }

    /// Open an existing database. A missing or unreadable file is a connection error.
    pub fn open(credentials: &DbCredentials) -> Result<Self, AppError> {
        let conn = Connection::open_with_flags(
            &credentials.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AppError::Connection(format!("{}: {}", credentials.path.display(), e)))?;
        // Force a page read so a non-database file fails here, not on the first query.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
            .map_err(|e| AppError::Connection(format!("{}: {}", credentials.path.display(), e)))?;
        log::info!("Connected to {} as {}", credentials.path.display(), credentials.user);
        Ok(Self::from_connection(conn))
    }

    /// Run a raw multi-statement script (seeding, maintenance).
    pub fn execute_batch(&self, sql: &str) -> Result<(), AppError> {
        let guard = self.lock()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| AppError::Connection("session closed".into()))?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Connection>>, AppError> {
        self.0
            .lock()
            .map_err(|_| AppError::Connection("session lock poisoned".into()))
    }
}

impl DbSession for SqliteSession {
    fn execute(&self, query: &Query) -> Result<Dataset, AppError> {
        let guard = self.lock()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| AppError::Connection("session closed".into()))?;

        let mut stmt = conn.prepare(&query.sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let bound: Vec<(&str, &dyn ToSql)> = query
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v as &dyn ToSql))
            .collect();

        let mut out = Vec::new();
        let mut rows = stmt.query(bound.as_slice())?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(names.len());
            for i in 0..names.len() {
                cells.push(Value::from_sql_ref(row.get_ref(i)?));
            }
            out.push(cells);
        }
        Ok(Dataset::from_rows(names, out))
    }

    fn close(&self) -> Result<(), AppError> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| AppError::Connection(e.to_string()))?;
            log::info!("Database session closed");
        }
        Ok(())
    }
}

/// Owns the single long-lived session. Built once by the composition root and
/// handed to whoever needs it; the session itself is opened on first demand.
pub struct ConnectionProvider {
    credentials: Option<DbCredentials>,
    session: Option<Arc<dyn DbSession>>,
}

impl ConnectionProvider {
    pub fn new(credentials: DbCredentials) -> Self {
        Self {
            credentials: Some(credentials),
            session: None,
        }
    }

    /// Provider around an already-open session (tests, embedding).
    pub fn with_session(session: Arc<dyn DbSession>) -> Self {
        Self {
            credentials: None,
            session: Some(session),
        }
    }

    /// Same session on every call until `shutdown`.
    pub fn get_connection(&mut self) -> Result<Arc<dyn DbSession>, AppError> {
        if let Some(session) = &self.session {
            return Ok(Arc::clone(session));
        }
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| AppError::Connection("no credentials to reconnect with".into()))?;
        let session: Arc<dyn DbSession> = Arc::new(SqliteSession::open(credentials)?);
        self.session = Some(Arc::clone(&session));
        Ok(session)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn shutdown(&mut self) -> Result<(), AppError> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

/// Create (if needed) and migrate a database file.
pub fn init_db(db_path: &Path) -> Result<SqliteSession, AppError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut conn = Connection::open(db_path).map_err(|e| AppError::Connection(e.to_string()))?;
    run_migrations(&mut conn)?;
    Ok(SqliteSession::from_connection(conn))
}

fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
    let tx = conn.transaction()?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT (datetime('now')))",
        [],
    )?;

    let applied: Vec<i32> = tx
        .prepare("SELECT version FROM schema_migrations ORDER BY version")?
        .query_map([], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    const MIGRATIONS: &[(i32, &str)] = &[(1, include_str!("../../migrations/0001_init.sql"))];

    for (version, sql) in MIGRATIONS {
        if applied.contains(version) {
            continue;
        }
        // The script records itself; we do that below with a timestamp.
        let statements: Vec<&str> = sql
            .split(';')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && !s.contains("INSERT INTO schema_migrations"))
            .collect();
        for stmt in statements {
            tx.execute(stmt, [])?;
        }
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )?;
        log::info!("Applied migration {}", version);
    }

    tx.commit()?;
    Ok(())
}

/// In-memory, migrated database seeded with a small listings fixture.
pub fn init_test_db() -> SqliteSession {
    let mut conn = Connection::open_in_memory().expect("open in-memory db");
    run_migrations(&mut conn).expect("migrate test db");
    conn.execute_batch(include_str!("fixtures.sql"))
        .expect("seed test db");
    SqliteSession::from_connection(conn)
}
