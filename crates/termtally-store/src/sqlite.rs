//! SQLite-based store implementation

use chrono::{DateTime, Local};
use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use termtally_util::{DeltaId, Username, minutes_to_seconds};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ApplyOutcome, AuditEvent, DeltaRecord, Store, StoreError, StoreResult, UserTotal};

/// Default wait on a locked database before a write fails
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest busy timeout SQLite accepts (`i32::MAX` milliseconds)
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

const UPSERT_TOTAL: &str = r#"
    INSERT INTO user_totals (username, total_seconds, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(username)
    DO UPDATE SET total_seconds = total_seconds + excluded.total_seconds,
                  updated_at = excluded.updated_at
"#;

/// SQLite-based store
///
/// Every write takes the connection guard and runs in its own transaction,
/// which commits on success and rolls back when dropped on any other path.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create a store, bounding how long writes wait on other writers
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        if busy_timeout > MAX_BUSY_TIMEOUT {
            return Err(StoreError::Database(format!(
                "busy timeout {:?} exceeds {:?}",
                busy_timeout, MAX_BUSY_TIMEOUT
            )));
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // WAL lets report readers run alongside the writer
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        debug!(journal_mode = %mode, busy_timeout_ms = busy_timeout.as_millis() as u64, "Store opened");

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an existing store for reading only.
    ///
    /// No schema or pragma changes are made; every write through the
    /// returned store fails.
    pub fn open_read_only(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Cumulative connected time per user
            CREATE TABLE IF NOT EXISTS user_totals (
                username TEXT PRIMARY KEY,
                total_seconds INTEGER NOT NULL DEFAULT 0 CHECK (total_seconds >= 0),
                updated_at TEXT NOT NULL
            );

            -- Every committed delta, for deduplication
            CREATE TABLE IF NOT EXISTS applied_deltas (
                delta_id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                host TEXT NOT NULL,
                session_id TEXT NOT NULL,
                seconds INTEGER NOT NULL CHECK (seconds >= 0),
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                reason TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_deltas_username ON applied_deltas(username);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn seconds_to_sql(username: &Username, seconds: u64) -> StoreResult<i64> {
    i64::try_from(seconds).map_err(|_| StoreError::InvalidDelta {
        username: username.to_string(),
        minutes: seconds as f64 / 60.0,
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .ok()
}

impl Store for SqliteStore {
    fn add_minutes(&self, username: &Username, minutes: f64) -> StoreResult<()> {
        let seconds = minutes_to_seconds(minutes).ok_or_else(|| StoreError::InvalidDelta {
            username: username.to_string(),
            minutes,
        })?;
        let seconds = seconds_to_sql(username, seconds)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            UPSERT_TOTAL,
            params![username.as_str(), seconds, termtally_util::now().to_rfc3339()],
        )?;
        tx.commit()?;

        debug!(username = %username, added_secs = seconds, "Minutes added");
        Ok(())
    }

    fn apply_delta(&self, delta: &DeltaRecord) -> StoreResult<ApplyOutcome> {
        let seconds = seconds_to_sql(&delta.username, delta.seconds)?;
        let applied_at = termtally_util::now().to_rfc3339();

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            r#"
            INSERT OR IGNORE INTO applied_deltas
                (delta_id, username, host, session_id, seconds, started_at, ended_at, reason, applied_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                delta.id.to_string(),
                delta.username.as_str(),
                delta.host.as_str(),
                delta.session_id.as_str(),
                seconds,
                delta.started_at.to_rfc3339(),
                delta.ended_at.to_rfc3339(),
                delta.reason.as_str(),
                applied_at,
            ],
        )?;

        if inserted == 0 {
            debug!(delta_id = %delta.id, "Delta already applied");
            return Ok(ApplyOutcome::Duplicate);
        }

        tx.execute(
            UPSERT_TOTAL,
            params![delta.username.as_str(), seconds, applied_at],
        )?;
        tx.commit()?;

        debug!(
            delta_id = %delta.id,
            username = %delta.username,
            added_secs = seconds,
            "Delta applied"
        );
        Ok(ApplyOutcome::Applied)
    }

    fn get_total(&self, username: &Username) -> StoreResult<UserTotal> {
        let conn = self.conn()?;

        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT total_seconds, updated_at FROM user_totals WHERE username = ?",
                [username.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((secs, updated_at)) => UserTotal {
                username: username.clone(),
                total_seconds: secs.max(0) as u64,
                updated_at: parse_timestamp(&updated_at),
            },
            None => UserTotal::zero(username.clone()),
        })
    }

    fn get_all(&self) -> StoreResult<Vec<UserTotal>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT username, total_seconds, updated_at FROM user_totals ORDER BY username",
        )?;

        let rows = stmt.query_map([], |row| {
            let username: String = row.get(0)?;
            let secs: i64 = row.get(1)?;
            let updated_at: String = row.get(2)?;
            Ok((username, secs, updated_at))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (username, secs, updated_at) = row?;
            totals.push(UserTotal {
                username: Username::new(username),
                total_seconds: secs.max(0) as u64,
                updated_at: parse_timestamp(&updated_at),
            });
        }

        Ok(totals)
    }

    fn is_delta_applied(&self, id: &DeltaId) -> StoreResult<bool> {
        let conn = self.conn()?;

        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM applied_deltas WHERE delta_id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = parse_timestamp(&timestamp_str).unwrap_or_else(termtally_util::now);
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
