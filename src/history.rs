use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::HistoryError;

pub type Result<T> = std::result::Result<T, HistoryError>;

/// One finished playthrough of a lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonRun {
    pub title: String,
    pub scene_count: usize,
    pub total_seconds: f64,
    pub completed_at: DateTime<Local>,
}

impl LessonRun {
    pub fn completed_now(lesson: &crate::lesson::Lesson) -> Self {
        Self {
            title: lesson.title().to_string(),
            scene_count: lesson.len(),
            total_seconds: lesson.total_duration(),
            completed_at: Local::now(),
        }
    }
}

/// Log of completed lessons. Playback position is never stored here.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_default() -> Result<Self> {
        let path = AppDirs::history_path().unwrap_or_else(|| PathBuf::from("sceneplay_history.db"));
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS lesson_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                scene_count INTEGER NOT NULL,
                total_seconds REAL NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_lesson_runs_title ON lesson_runs(title)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record_completion(&self, run: &LessonRun) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO lesson_runs (title, scene_count, total_seconds, completed_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                run.title,
                run.scene_count as i64,
                run.total_seconds,
                run.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent completions first.
    pub fn recent(&self, limit: usize) -> Result<Vec<LessonRun>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT title, scene_count, total_seconds, completed_at
            FROM lesson_runs
            ORDER BY completed_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_run)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn completions_for(&self, title: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lesson_runs WHERE title = ?1",
            params![title],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM lesson_runs", [])?;
        Ok(())
    }

    fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<LessonRun> {
        let completed_at: String = row.get(3)?;
        let completed_at = DateTime::parse_from_rfc3339(&completed_at)
            .map(|dt| dt.with_timezone(&Local))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;
        Ok(LessonRun {
            title: row.get(0)?,
            scene_count: row.get::<_, i64>(1)? as usize,
            total_seconds: row.get(2)?,
            completed_at,
        })
    }
}
