use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::clock::{Clock, SystemClock};
use crate::problem::ProblemId;
use crate::result::AttemptResult;

/// Hard per-user, per-day cap on recorded attempts.
pub const MAX_DAILY_ATTEMPTS: u32 = 3;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifier of a practicing user, issued by whatever authentication layer
/// sits in front of the engine. Opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable record of one admitted attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub user_id: UserId,
    pub problem_id: ProblemId,
    pub wpm: u32,
    pub accuracy: u8,
    pub time_spent_secs: u32,
    pub completed: bool,
    pub completed_at: DateTime<Local>,
}

/// Read-only view of a user's quota for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub remaining: u32,
    pub can_attempt: bool,
}

#[derive(Debug, Error)]
pub enum QuotaError {
    /// Today's cap is exhausted. An expected outcome, not worth retrying
    /// until the day rolls over.
    #[error("daily attempt limit reached ({used}/{cap})")]
    Exceeded { used: u32, cap: u32 },
    /// The attempt store could not complete the operation. Nothing was
    /// consumed or recorded; retrying is safe.
    #[error("attempt store unavailable: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Admission control and ledger for daily practice attempts.
///
/// Counters live in `daily_quotas`, one row per `(user, day)`; admitted
/// attempts land in `attempts`. Both tables are written in a single
/// immediate transaction per admission, and the admission decision itself
/// is one conditional upsert, so concurrent callers over the same database
/// file can never push a counter past the cap or record an attempt the
/// counter did not pay for.
#[derive(Debug)]
pub struct QuotaEnforcer {
    conn: Connection,
    cap: u32,
    clock: Box<dyn Clock>,
}

impl QuotaEnforcer {
    /// Open the attempt store at the default per-user location, creating
    /// the file and schema as needed.
    pub fn open_default() -> Result<Self, QuotaError> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typedrill.db"));
        Self::open(db_path)
    }

    /// Open the attempt store at `path`, creating the file and schema as
    /// needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, QuotaError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Wrap an existing connection. In-memory connections work for tests;
    /// note that each in-memory connection is its own private database.
    pub fn with_connection(conn: Connection) -> Result<Self, QuotaError> {
        // contending writers wait for the lock instead of failing fast
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init_schema(&conn)?;
        Ok(QuotaEnforcer {
            conn,
            cap: MAX_DAILY_ATTEMPTS,
            clock: Box::new(SystemClock),
        })
    }

    /// Override the daily cap. Intended for tests.
    pub fn with_cap(mut self, cap: u32) -> Self {
        self.cap = cap;
        self
    }

    /// Override the time source. Intended for tests.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS daily_quotas (
                user_id       TEXT NOT NULL,
                day           TEXT NOT NULL,
                attempts_used INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, day)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL,
                problem_id      TEXT NOT NULL,
                day             TEXT NOT NULL,
                wpm             INTEGER NOT NULL,
                accuracy        INTEGER NOT NULL,
                time_spent_secs INTEGER NOT NULL,
                completed       BOOLEAN NOT NULL,
                completed_at    TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_user_day ON attempts(user_id, day)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_user_completed_at ON attempts(user_id, completed_at)",
            [],
        )?;

        Ok(())
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Consume one unit of today's quota and record the attempt, or refuse
    /// without writing anything.
    ///
    /// The counter bump and the record insert commit together or not at
    /// all. The decision is a single conditional upsert whose affected-row
    /// count is the verdict: zero rows means the counter already sits at
    /// the cap and the transaction rolls back untouched. There is no
    /// separate read of the counter, so two racing callers cannot both see
    /// "one slot left" and both take it.
    pub fn try_record_attempt(
        &mut self,
        user_id: &UserId,
        problem_id: &ProblemId,
        result: &AttemptResult,
    ) -> Result<AttemptRecord, QuotaError> {
        if self.cap == 0 {
            return Err(QuotaError::Exceeded { used: 0, cap: 0 });
        }
        // one clock reading supplies both the timestamp and the quota day
        let now = self.clock.now();
        let day = now.date_naive();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let admitted = tx.execute(
            r#"
            INSERT INTO daily_quotas (user_id, day, attempts_used)
            VALUES (?1, ?2, 1)
            ON CONFLICT(user_id, day) DO UPDATE
            SET attempts_used = attempts_used + 1
            WHERE attempts_used < ?3
            "#,
            params![user_id.as_str(), day.to_string(), self.cap],
        )?;

        if admitted == 0 {
            // dropping the transaction rolls it back
            debug!(
                user = user_id.as_str(),
                day = %day,
                cap = self.cap,
                "attempt refused, daily quota exhausted"
            );
            return Err(QuotaError::Exceeded {
                used: self.cap,
                cap: self.cap,
            });
        }

        tx.execute(
            r#"
            INSERT INTO attempts
            (user_id, problem_id, day, wpm, accuracy, time_spent_secs, completed, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user_id.as_str(),
                problem_id.as_str(),
                day.to_string(),
                result.wpm,
                result.accuracy,
                result.time_spent_secs,
                result.completed,
                now.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(
            user = user_id.as_str(),
            day = %day,
            wpm = result.wpm,
            accuracy = result.accuracy,
            "attempt recorded"
        );

        Ok(AttemptRecord {
            id,
            user_id: user_id.clone(),
            problem_id: problem_id.clone(),
            wpm: result.wpm,
            accuracy: result.accuracy,
            time_spent_secs: result.time_spent_secs,
            completed: result.completed,
            completed_at: now,
        })
    }

    /// Today's quota consumption for `user_id`. A user with no row yet has
    /// used nothing.
    pub fn quota_status(&self, user_id: &UserId) -> Result<QuotaStatus, QuotaError> {
        let day = self.clock.today();
        let used: u32 = self
            .conn
            .query_row(
                "SELECT attempts_used FROM daily_quotas WHERE user_id = ?1 AND day = ?2",
                params![user_id.as_str(), day.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let remaining = self.cap.saturating_sub(used);
        Ok(QuotaStatus {
            used,
            remaining,
            can_attempt: remaining > 0,
        })
    }

    /// Number of recorded attempts for `user_id` on `day`. Always equal to
    /// that day's counter when both were written through this enforcer.
    pub fn attempt_count_for_day(
        &self,
        user_id: &UserId,
        day: NaiveDate,
    ) -> Result<u32, QuotaError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM attempts WHERE user_id = ?1 AND day = ?2",
            params![user_id.as_str(), day.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent attempts for `user_id`, newest first.
    pub fn recent_attempts(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, QuotaError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, problem_id, wpm, accuracy, time_spent_secs, completed, completed_at
            FROM attempts
            WHERE user_id = ?1
            ORDER BY completed_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let record_iter = stmt.query_map(params![user_id.as_str(), limit], |row| {
            let completed_at_str: String = row.get(7)?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        7,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(AttemptRecord {
                id: row.get(0)?,
                user_id: UserId::new(row.get::<_, String>(1)?),
                problem_id: ProblemId::new(row.get::<_, String>(2)?),
                wpm: row.get(3)?,
                accuracy: row.get(4)?,
                time_spent_secs: row.get(5)?,
                completed: row.get(6)?,
                completed_at,
            })
        })?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }
}
