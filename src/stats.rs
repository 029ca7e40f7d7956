use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::stimulus::{StimulusKind, TrialRecord};
use crate::summary::SessionSummary;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        played_at TEXT NOT NULL,
        grid_size INTEGER NOT NULL,
        total_rounds INTEGER NOT NULL,
        score INTEGER NOT NULL,
        hit_rate REAL NOT NULL,
        avg_reaction_ms REAL NOT NULL,
        fastest_reaction_ms REAL NOT NULL,
        slowest_reaction_ms REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trials (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        round INTEGER NOT NULL,
        kind TEXT NOT NULL,
        was_correct BOOLEAN NOT NULL,
        reaction_ms INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_trials_kind ON trials(kind);
    CREATE INDEX IF NOT EXISTS idx_sessions_played_at ON sessions(played_at);
"#;

/// One row of the session history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub id: i64,
    pub played_at: DateTime<Local>,
    pub grid_size: i64,
    pub total_rounds: i64,
    pub score: i64,
    pub hit_rate: f64,
    pub avg_reaction_ms: f64,
    pub fastest_reaction_ms: f64,
    pub slowest_reaction_ms: f64,
}

/// Historical performance for one stimulus kind across all stored sessions
#[derive(Debug, Clone, PartialEq)]
pub struct KindHistory {
    pub kind: StimulusKind,
    pub attempts: i64,
    pub hit_rate: f64,
    pub avg_reaction_ms: Option<f64>,
}

/// SQLite-backed session history
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database at the default state path, creating tables if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("focustap_stats.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    /// Store a finished session and its rounds in one transaction. Returns the session id.
    pub fn record_session(
        &mut self,
        summary: &SessionSummary,
        records: &[TrialRecord],
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO sessions
            (played_at, grid_size, total_rounds, score, hit_rate,
             avg_reaction_ms, fastest_reaction_ms, slowest_reaction_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                Local::now().to_rfc3339(),
                summary.grid_size as i64,
                summary.total_rounds,
                summary.score,
                summary.hit_rate,
                summary.avg_reaction_ms,
                summary.fastest_reaction_ms,
                summary.slowest_reaction_ms,
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for (round, record) in records.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO trials (session_id, round, kind, was_correct, reaction_ms)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    session_id,
                    round as i64 + 1,
                    record.kind.as_tag(),
                    record.is_correct(),
                    record.reaction_ms.map(|ms| ms as i64),
                ],
            )?;
        }

        tx.commit()?;
        info!(session_id, score = summary.score, "session stored");
        Ok(session_id)
    }

    /// Most recent sessions first
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRow>> {
        self.query_sessions(limit as i64)
    }

    /// A negative limit returns every session
    fn query_sessions(&self, limit: i64) -> Result<Vec<SessionRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, played_at, grid_size, total_rounds, score, hit_rate,
                   avg_reaction_ms, fastest_reaction_ms, slowest_reaction_ms
            FROM sessions
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit], |row| {
            let played_at_str: String = row.get(1)?;
            let played_at = DateTime::parse_from_rfc3339(&played_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        1,
                        "played_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(SessionRow {
                id: row.get(0)?,
                played_at,
                grid_size: row.get(2)?,
                total_rounds: row.get(3)?,
                score: row.get(4)?,
                hit_rate: row.get(5)?,
                avg_reaction_ms: row.get(6)?,
                fastest_reaction_ms: row.get(7)?,
                slowest_reaction_ms: row.get(8)?,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    pub fn session_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Hit rate and average reaction per stimulus kind over every stored round
    pub fn kind_summary(&self) -> Result<Vec<KindHistory>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                kind,
                COUNT(*) as attempts,
                (SUM(CASE WHEN was_correct = 1 THEN 1 ELSE 0 END) * 100.0 / COUNT(*)) as hit_rate,
                AVG(reaction_ms) as avg_reaction
            FROM trials
            GROUP BY kind
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let tag: String = row.get(0)?;
            let attempts: i64 = row.get(1)?;
            let hit_rate: f64 = row.get(2)?;
            let avg_reaction_ms: Option<f64> = row.get(3)?;
            Ok((tag, attempts, hit_rate, avg_reaction_ms))
        })?;

        let mut summary = Vec::new();
        for row in rows {
            let (tag, attempts, hit_rate, avg_reaction_ms) = row?;
            if let Some(kind) = StimulusKind::from_tag(&tag) {
                summary.push(KindHistory {
                    kind,
                    attempts,
                    hit_rate,
                    avg_reaction_ms,
                });
            }
        }
        summary.sort_by_key(|h| h.kind.index());
        Ok(summary)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM trials; DELETE FROM sessions;")?;
        Ok(())
    }

    /// Write the whole session history to a CSV file, oldest first
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let mut sessions = self.query_sessions(-1)?;
        sessions.reverse();

        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for session in &sessions {
            writer.serialize(session)?;
        }
        writer.flush()?;

        info!(path = ?path.as_ref(), rows = sessions.len(), "history exported");
        Ok(sessions.len())
    }
}
