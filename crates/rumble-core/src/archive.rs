//! Export file discovery and chronological ordering.
//!
//! Exports for one channel live under `<root>/<channel-id>/`, possibly in
//! nested directories. Files overlap arbitrarily in naming, so replay order
//! is decided by the timestamp of each file's first message, with the path
//! as a deterministic tie-break. Only that first timestamp is decoded when
//! listing; the remaining messages are skipped without being materialized.

use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::Deserialize;

use crate::discord::Export;
use crate::error::IngestError;

/// An export file located on disk, ready to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    /// `None` when the export holds no messages.
    pub first_message_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ExportHeader {
    #[serde(default, deserialize_with = "first_message_timestamp")]
    messages: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TimestampOnly {
    timestamp: DateTime<Utc>,
}

fn first_message_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FirstTimestamp;

    impl<'de> Visitor<'de> for FirstTimestamp {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an array of messages")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let first = seq.next_element::<TimestampOnly>()?.map(|m| m.timestamp);
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(first)
        }
    }

    deserializer.deserialize_seq(FirstTimestamp)
}

fn read_error(path: &Path, reason: impl fmt::Display) -> IngestError {
    IngestError::Read {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Decode only the first message timestamp of an export file.
///
/// Returns `Ok(None)` for an export without messages.
///
/// # Errors
///
/// Returns [`IngestError::Read`] if the file cannot be opened or decoded.
pub fn peek_first_timestamp(path: &Path) -> Result<Option<DateTime<Utc>>, IngestError> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    let header: ExportHeader =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| read_error(path, e))?;
    Ok(header.messages)
}

/// Fully decode an export file.
///
/// # Errors
///
/// Returns [`IngestError::Read`] if the file cannot be opened or decoded.
pub fn load_export(path: &Path) -> Result<Export, IngestError> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| read_error(path, e))
}

/// List all exports of one channel, ordered for replay.
///
/// A missing channel directory yields an empty list with a warning.
///
/// # Errors
///
/// Returns [`IngestError::Read`] if a directory cannot be listed or a file
/// header cannot be decoded.
pub fn list_exports(root: &Path, channel_id: &str) -> Result<Vec<ExportFile>, IngestError> {
    let channel_dir = root.join(channel_id);
    if !channel_dir.is_dir() {
        tracing::warn!(
            channel_id,
            path = %channel_dir.display(),
            "channel export directory not found, nothing to replay"
        );
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    collect_json_files(&channel_dir, &mut paths)?;

    let mut exports = Vec::with_capacity(paths.len());
    for path in paths {
        let first_message_at = peek_first_timestamp(&path)?;
        exports.push(ExportFile {
            path,
            first_message_at,
        });
    }

    sort_for_replay(&mut exports);
    Ok(exports)
}

/// Order exports by first message time, then by path. Empty exports sort
/// first.
pub fn sort_for_replay(exports: &mut [ExportFile]) {
    exports.sort_by(|a, b| {
        a.first_message_at
            .cmp(&b.first_message_at)
            .then_with(|| a.path.cmp(&b.path))
    });
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), IngestError> {
    let entries = fs::read_dir(dir).map_err(|e| read_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| read_error(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| read_error(&path, e))?;
        if file_type.is_dir() {
            collect_json_files(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            out.push(path);
        }
    }
    Ok(())
}
