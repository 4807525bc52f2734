//! Full import: replay every configured channel into the store.
//!
//! Channels are processed one after another in the order given. Within a
//! channel, exports are replayed in first-message order, each inside one
//! write transaction. A fatal error rolls back the failing export and ends
//! the run; exports committed before it stay, and a rerun converges on the
//! same store contents.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::archive::{list_exports, load_export};
use crate::db::store::{Store, StoreCounts};
use crate::error::IngestError;
use crate::interpret::{ChannelContext, InterpretStats, Interpreter};

/// What to import.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory holding one sub-directory per channel.
    pub root: PathBuf,
    /// Channel IDs in processing order.
    pub channels: Vec<String>,
    /// Author ID of the game bot.
    pub bot_author_id: String,
}

/// Summary returned after an import.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub channels: usize,
    /// Export files replayed.
    pub files: usize,
    /// Export files without messages.
    pub empty_files: usize,
    pub stats: InterpretStats,
    /// Store row counts after the import.
    pub store: StoreCounts,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Replay all channels of `options` into the store behind `conn`.
///
/// # Errors
///
/// Returns the first fatal [`IngestError`], wrapped with the export path
/// and message ID it came from.
pub fn ingest(conn: &Connection, options: &IngestOptions) -> Result<IngestReport, IngestError> {
    let start = Instant::now();
    let store = Store::new(conn);
    let mut interpreter = Interpreter::new(store, options.bot_author_id.clone())?;

    let mut files = 0;
    let mut empty_files = 0;
    for channel_id in &options.channels {
        let exports = list_exports(&options.root, channel_id)?;
        tracing::info!(channel_id, exports = exports.len(), "replaying channel");

        let mut ctx = ChannelContext::new(channel_id.clone());
        for file in exports {
            if file.first_message_at.is_none() {
                tracing::warn!(path = %file.path.display(), "skipping export without messages");
                empty_files += 1;
                continue;
            }
            let export = load_export(&file.path)?;

            store.begin()?;
            if let Err(error) = interpreter.interpret_export(&mut ctx, &export) {
                store.rollback();
                return Err(error.in_export(&file.path));
            }
            store.commit()?;

            tracing::debug!(
                path = %file.path.display(),
                messages = export.messages.len(),
                state = ?ctx.state(),
                "export replayed"
            );
            files += 1;
        }

        if let Some(game) = &ctx.game {
            tracing::info!(
                channel_id,
                last_game = game.id,
                state = ?ctx.state(),
                "channel replay finished"
            );
        }
    }

    store.record_import(Utc::now())?;

    let report = IngestReport {
        channels: options.channels.len(),
        files,
        empty_files,
        stats: interpreter.into_stats(),
        store: store.counts()?,
        elapsed: start.elapsed(),
    };
    tracing::info!(
        channels = report.channels,
        files = report.files,
        games = report.store.games,
        rounds = report.store.rounds,
        unknown = report.stats.unknown,
        elapsed_ms = report.elapsed.as_millis(),
        "import complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use std::fs;

    fn test_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    fn options(root: PathBuf, channels: &[&str]) -> IngestOptions {
        IngestOptions {
            root,
            channels: channels.iter().map(ToString::to_string).collect(),
            bot_author_id: "BOT".into(),
        }
    }

    #[test]
    fn missing_channels_import_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = test_db();
        let report = ingest(&conn, &options(dir.path().to_path_buf(), &["1", "2"]))
            .expect("import");
        assert_eq!(report.channels, 2);
        assert_eq!(report.files, 0);
        assert_eq!(report.store.games, 0);
    }

    #[test]
    fn empty_exports_are_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let channel = dir.path().join("7");
        fs::create_dir_all(&channel).expect("mkdir");
        fs::write(channel.join("empty.json"), r#"{"channel":{"id":"7"},"messages":[]}"#)
            .expect("write export");

        let conn = test_db();
        let report = ingest(&conn, &options(dir.path().to_path_buf(), &["7"])).expect("import");
        assert_eq!(report.files, 0);
        assert_eq!(report.empty_files, 1);
    }

    #[test]
    fn failing_export_is_rolled_back_and_wrapped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let channel = dir.path().join("7");
        fs::create_dir_all(&channel).expect("mkdir");
        fs::write(
            channel.join("bad.json"),
            r#"{"channel":{"id":"7"},"messages":[
                {"id":"m1","timestamp":"2024-04-01T00:00:00+00:00","author":{"id":"U1","name":"alex"}},
                {"id":"m2","timestamp":"2024-04-01T00:00:01+00:00","author":{"id":"","name":"ghost"}}
            ]}"#,
        )
        .expect("write export");

        let conn = test_db();
        let err = ingest(&conn, &options(dir.path().to_path_buf(), &["7"])).expect_err("fails");
        assert!(matches!(err, IngestError::InExport { .. }));
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidId);
        assert!(err.to_string().contains("bad.json"));

        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .expect("count");
        assert_eq!(users, 0, "partial export must be rolled back");
    }
}
