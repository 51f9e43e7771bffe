use std::{
    path::Path,
    sync::{Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use rusqlite::{Connection, OptionalExtension, params};

use crate::types::{TranscriptResponse, TranscriptSegment};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transcripts (
    video_id   TEXT    NOT NULL,
    language   TEXT    NOT NULL,
    segments   TEXT    NOT NULL,
    fetched_at INTEGER NOT NULL,
    PRIMARY KEY (video_id, language)
);
";

/// Fetched transcripts persisted in `SQLite`
///
/// Published caption tracks do not change, so entries never expire.
pub struct TranscriptStore {
    conn: Mutex<Connection>,
}

impl TranscriptStore {
    /// Open or create the store at `path`, in memory when `None`
    pub fn open(path: Option<&Path>) -> rusqlite::Result<Self> {
        let conn = match path {
            Some(path) => {
                let conn = Connection::open(path)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn
            }
            None => Connection::open_in_memory()?,
        };

        conn.execute_batch(SCHEMA)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn get(&self, video_id: &str, language: &str) -> rusqlite::Result<Option<TranscriptResponse>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let segments: Option<String> = conn
            .query_row(
                "SELECT segments FROM transcripts WHERE video_id = ?1 AND language = ?2",
                params![video_id, language],
                |row| row.get(0),
            )
            .optional()?;

        let Some(segments) = segments else {
            return Ok(None);
        };

        let segments: Vec<TranscriptSegment> = serde_json::from_str(&segments)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;

        Ok(Some(TranscriptResponse::new(video_id, language, segments)))
    }

    pub fn put(&self, transcript: &TranscriptResponse) -> rusqlite::Result<()> {
        let segments = serde_json::to_string(&transcript.segments)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let fetched_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));

        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO transcripts (video_id, language, segments, fetched_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (video_id, language)
             DO UPDATE SET segments = excluded.segments, fetched_at = excluded.fetched_at",
            params![transcript.video_id, transcript.language, segments, fetched_at],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(video_id: &str, language: &str) -> TranscriptResponse {
        TranscriptResponse::new(
            video_id,
            language,
            vec![
                TranscriptSegment {
                    start_ms: 0,
                    duration_ms: 1500,
                    text: "Hello".into(),
                },
                TranscriptSegment {
                    start_ms: 1500,
                    duration_ms: 2000,
                    text: "world".into(),
                },
            ],
        )
    }

    #[test]
    fn lookups_are_keyed_by_language() {
        let store = TranscriptStore::open(None).unwrap();
        store.put(&transcript("dQw4w9WgXcQ", "en")).unwrap();

        let cached = store.get("dQw4w9WgXcQ", "en").unwrap().unwrap();
        assert_eq!(cached.text, "Hello world");
        assert_eq!(cached.segments[1].start_ms, 1500);

        assert!(store.get("dQw4w9WgXcQ", "de").unwrap().is_none());
    }

    #[test]
    fn transcripts_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcripts.db");

        {
            let store = TranscriptStore::open(Some(&path)).unwrap();
            store.put(&transcript("dQw4w9WgXcQ", "en")).unwrap();
            store.put(&transcript("dQw4w9WgXcQ", "en")).unwrap();
        }

        let reopened = TranscriptStore::open(Some(&path)).unwrap();
        let cached = reopened.get("dQw4w9WgXcQ", "en").unwrap().unwrap();
        assert_eq!(cached.segments.len(), 2);
    }
}
