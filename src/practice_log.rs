//! Defines how users and their practice-session logs are stored.
//!
//! A session log stores the raw JSON blob of the events recorded by the client during one
//! practice session, along with the final score and duration. The blob is written and read back
//! verbatim so event kinds this crate does not interpret survive persistence. The weakness
//! analyzer only ever reads a bounded, most-recent-first page of a user's logs.

use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use rusqlite_migration::{M, Migrations};
use ustr::Ustr;

use crate::{data::SessionLog, error::PracticeLogError};

/// Contains functions to store and retrieve users and their session logs.
pub trait PracticeLog {
    /// Ensures a user with the given ID exists, creating it with the given timestamp if needed.
    /// Returns whether the user was newly created.
    fn open_user(&mut self, user_id: &Ustr, timestamp: i64) -> Result<bool, PracticeLogError>;

    /// Records one completed practice session. Logs are append-only and immutable once recorded.
    fn record_session(&mut self, log: &SessionLog) -> Result<(), PracticeLogError>;

    /// Retrieves the last `num_logs` session logs for the given user, most recent first.
    fn get_recent_logs(
        &self,
        user_id: &Ustr,
        num_logs: usize,
    ) -> Result<Vec<SessionLog>, PracticeLogError>;
}

/// An implementation of [`PracticeLog`] backed by SQLite.
pub struct PracticeLogDB {
    /// A pool of connections to the database storing the logs.
    pool: Pool<SqliteConnectionManager>,
}

impl PracticeLogDB {
    /// Returns all the migrations needed to set up the database.
    fn migrations() -> Migrations<'static> {
        Migrations::new(vec![
            // Create a minimal users table. Creation time is kept for display purposes only.
            M::up("CREATE TABLE users(user_id TEXT PRIMARY KEY, created_at INTEGER NOT NULL);")
                .down("DROP TABLE users;"),
            // Create the table storing one row per completed session, with the raw JSON blob of
            // the events recorded by the client.
            M::up(
                "CREATE TABLE logs(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                lesson_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                duration_ms INTEGER NOT NULL,
                score INTEGER NOT NULL,
                event_data TEXT NOT NULL);",
            )
            .down("DROP TABLE logs;"),
            // Create a combined index of `user_id` and `timestamp` for fast retrieval of the most
            // recent logs of one user.
            M::up("CREATE INDEX user_logs ON logs (user_id, timestamp);")
                .down("DROP INDEX user_logs;"),
        ])
    }

    /// Initializes the database by running the migrations. If the migrations have been applied
    /// already, they will have no effect on the database.
    fn init(&mut self) -> Result<()> {
        let mut connection = self.pool.get()?;
        let migrations = Self::migrations();
        migrations
            .to_latest(&mut connection)
            .with_context(|| "failed to initialize practice log DB")
    }

    /// A constructor taking a SQLite connection manager.
    pub(crate) fn new(connection_manager: SqliteConnectionManager) -> Result<PracticeLogDB> {
        let pool = Pool::new(connection_manager)?;
        let mut practice_log = PracticeLogDB { pool };
        practice_log.init()?;
        Ok(practice_log)
    }

    /// A constructor taking the path to a database file.
    pub fn new_from_disk(db_path: &str) -> Result<PracticeLogDB> {
        let connection_manager = SqliteConnectionManager::file(db_path).with_init(
            |connection: &mut Connection| -> Result<(), rusqlite::Error> {
                // The following pragma statements are set to improve the read and write
                // performance of SQLite. See the SQLite [docs](https://www.sqlite.org/pragma.html)
                // for more information.
                connection.pragma_update(None, "journal_mode", "WAL")?;
                connection.pragma_update(None, "synchronous", "NORMAL")
            },
        );
        Self::new(connection_manager)
    }

    /// Helper function to insert a user if it does not exist yet.
    fn open_user_helper(&mut self, user_id: &Ustr, timestamp: i64) -> Result<bool> {
        let connection = self.pool.get()?;
        let mut stmt = connection
            .prepare_cached("INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?1, ?2);")?;
        let inserted = stmt.execute(params![user_id.as_str(), timestamp])?;
        Ok(inserted > 0)
    }

    /// Helper function to append one session log.
    fn record_session_helper(&mut self, log: &SessionLog) -> Result<()> {
        let connection = self.pool.get()?;
        let mut stmt = connection.prepare_cached(
            "INSERT INTO logs (user_id, lesson_id, timestamp, duration_ms, score, event_data)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        )?;
        stmt.execute(params![
            log.user_id.as_str(),
            log.lesson_id.as_str(),
            log.timestamp,
            log.duration_ms,
            log.score,
            log.event_data,
        ])?;
        Ok(())
    }

    /// Helper function to retrieve the most recent logs of one user.
    fn get_recent_logs_helper(&self, user_id: &Ustr, num_logs: usize) -> Result<Vec<SessionLog>> {
        let connection = self.pool.get()?;
        let mut stmt = connection.prepare_cached(
            "SELECT lesson_id, timestamp, duration_ms, score, event_data FROM logs
                WHERE user_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2;",
        )?;

        let user_id = *user_id;
        let rows = stmt
            .query_map(params![user_id.as_str(), num_logs], move |row| {
                let lesson_id: String = row.get(0)?;
                Ok(SessionLog {
                    user_id,
                    lesson_id: Ustr::from(&lesson_id),
                    timestamp: row.get(1)?,
                    duration_ms: row.get(2)?,
                    score: row.get(3)?,
                    event_data: row.get(4)?,
                })
            })?
            .map(|row| row.with_context(|| format!("cannot read session log for user {user_id}")))
            .collect::<Result<Vec<SessionLog>>>()?;
        Ok(rows)
    }
}

impl PracticeLog for PracticeLogDB {
    fn open_user(&mut self, user_id: &Ustr, timestamp: i64) -> Result<bool, PracticeLogError> {
        self.open_user_helper(user_id, timestamp)
            .map_err(|e| PracticeLogError::OpenUser(*user_id, e))
    }

    fn record_session(&mut self, log: &SessionLog) -> Result<(), PracticeLogError> {
        self.record_session_helper(log)
            .map_err(|e| PracticeLogError::RecordSession(log.user_id, e))
    }

    fn get_recent_logs(
        &self,
        user_id: &Ustr,
        num_logs: usize,
    ) -> Result<Vec<SessionLog>, PracticeLogError> {
        self.get_recent_logs_helper(user_id, num_logs)
            .map_err(|e| PracticeLogError::GetLogs(*user_id, e))
    }
}
