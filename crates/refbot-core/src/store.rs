use std::{
    path::Path,
    str::FromStr,
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::{
    domain::{Status, UserId, UserRecord},
    errors::Error,
    Result,
};

const RECORD_COLUMNS: &str =
    "telegram_id, display_name, referral_code, confirmed, submitted_handle, status, created_at, updated_at";

/// Per-status tally for one referral code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCount {
    pub referral_code: String,
    pub status: Status,
    pub count: i64,
}

/// SQLite-backed store of user referral records.
///
/// Single-writer assumption: all access goes through one `Mutex<Connection>`,
/// so every method is atomic with respect to a single record.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means another thread panicked mid-query; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the record for `user_id`, creating it on first contact.
    ///
    /// New records start Pending with the configured referral code. For
    /// existing records a changed @username is refreshed best-effort.
    pub fn get_or_create(
        &self,
        user_id: UserId,
        display_name: Option<&str>,
        referral_code: &str,
    ) -> Result<UserRecord> {
        let conn = self.conn();

        let existing = query_record(&conn, user_id)?;
        if let Some(record) = existing {
            if let Some(name) = display_name {
                if record.display_name.as_deref() != Some(name) {
                    conn.execute(
                        "UPDATE users SET display_name = ?1, updated_at = ?2 WHERE telegram_id = ?3",
                        params![name, Utc::now().to_rfc3339(), user_id.0],
                    )?;
                    return query_record(&conn, user_id)?
                        .ok_or(Error::UserNotFound(user_id.0));
                }
            }
            return Ok(record);
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (telegram_id, display_name, referral_code, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![user_id.0, display_name, referral_code, now],
        )?;

        query_record(&conn, user_id)?.ok_or(Error::UserNotFound(user_id.0))
    }

    pub fn find(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        let conn = self.conn();
        query_record(&conn, user_id)
    }

    /// Record that the user confirmed requirement completion (step 1).
    pub fn mark_confirmed(&self, user_id: UserId) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE users SET confirmed = 1, updated_at = ?1 WHERE telegram_id = ?2",
            params![Utc::now().to_rfc3339(), user_id.0],
        )?;
        if changed == 0 {
            return Err(Error::UserNotFound(user_id.0));
        }
        Ok(())
    }

    /// Store the submitted platform username (step 2).
    pub fn save_handle(&self, user_id: UserId, handle: &str) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE users SET submitted_handle = ?1, confirmed = 1, updated_at = ?2
             WHERE telegram_id = ?3",
            params![handle, Utc::now().to_rfc3339(), user_id.0],
        )?;
        if changed == 0 {
            return Err(Error::UserNotFound(user_id.0));
        }
        Ok(())
    }

    /// Admin-triggered status transition.
    pub fn set_status(&self, user_id: UserId, status: Status) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE users SET status = ?1, updated_at = ?2 WHERE telegram_id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), user_id.0],
        )?;
        if changed == 0 {
            return Err(Error::UserNotFound(user_id.0));
        }
        Ok(())
    }

    /// All records, oldest first.
    pub fn list_all(&self) -> Result<Vec<UserRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM users ORDER BY created_at, telegram_id"
        ))?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Record counts per status, grouped by referral code. The grouping stays
    /// correct if multiple codes are ever deployed.
    pub fn status_counts(&self) -> Result<Vec<StatusCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(referral_code, ''), status, COUNT(*)
             FROM users GROUP BY referral_code, status
             ORDER BY referral_code, status",
        )?;
        let rows = stmt.query_map([], |row| {
            let referral_code: String = row.get(0)?;
            let status_raw: String = row.get(1)?;
            let count: i64 = row.get(2)?;
            Ok((referral_code, status_raw, count))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (referral_code, status_raw, count) = row?;
            out.push(StatusCount {
                referral_code,
                status: Status::from_str(&status_raw)?,
                count,
            });
        }
        Ok(out)
    }
}

/// Create the schema and apply incremental migrations. Safe to run
/// repeatedly: the second run is a no-op.
fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            telegram_id INTEGER PRIMARY KEY,
            display_name TEXT,
            referral_code TEXT,
            confirmed INTEGER NOT NULL DEFAULT 0,
            submitted_handle TEXT,
            status TEXT NOT NULL DEFAULT 'Pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;

    // `referral_code` arrived after the first deployed schema; databases
    // created before it need the column added in place. Existing rows get
    // NULL, surfaced as an empty code.
    if !column_exists(conn, "users", "referral_code")? {
        conn.execute_batch("ALTER TABLE users ADD COLUMN referral_code TEXT;")?;
        tracing::info!("added referral_code column to users");
    }

    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn
        .prepare(&format!(
            "SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1"
        ))?
        .query_row([column], |row| row.get(0))?;
    Ok(count > 0)
}

fn query_record(conn: &Connection, user_id: UserId) -> Result<Option<UserRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM users WHERE telegram_id = ?1"
    ))?;
    let mut rows = stmt.query_map([user_id.0], row_to_record)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let status_raw: String = row.get(5)?;
    let created_raw: String = row.get(6)?;
    let updated_raw: String = row.get(7)?;

    Ok(UserRecord {
        user_id: UserId(row.get(0)?),
        display_name: row.get(1)?,
        referral_code: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        confirmed: row.get::<_, i64>(3)? != 0,
        submitted_handle: row.get(4)?,
        status: Status::from_str(&status_raw).map_err(|e| conversion_err(5, e))?,
        created_at: parse_ts(6, &created_raw)?,
        updated_at: parse_ts(7, &updated_raw)?,
    })
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}
