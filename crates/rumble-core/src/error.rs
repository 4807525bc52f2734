use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for scripted decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ArchiveRead,
    ConfigParseError,
    InvalidId,
    UnsupportedMultiItem,
    InconsistentState,
    MalformedField,
    StoreFailure,
    StoreNotFound,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ArchiveRead => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidId => "E2001",
            Self::UnsupportedMultiItem => "E2002",
            Self::InconsistentState => "E2003",
            Self::MalformedField => "E2004",
            Self::StoreFailure => "E3001",
            Self::StoreNotFound => "E3002",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ArchiveRead => "Export archive could not be read",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidId => "Empty or invalid actor ID",
            Self::UnsupportedMultiItem => "Narrative line mentions more than one item",
            Self::InconsistentState => "Lifecycle event does not fit the channel state",
            Self::MalformedField => "Structured field could not be parsed",
            Self::StoreFailure => "SQLite store operation failed",
            Self::StoreNotFound => "Store database not found",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ArchiveRead => Some("Check that the export file is complete, valid JSON."),
            Self::ConfigParseError => Some("Fix syntax in rumble.toml and retry."),
            Self::InvalidId => None,
            Self::UnsupportedMultiItem => {
                Some("Triage the reported line; multi-item narrative is not modelled yet.")
            }
            Self::InconsistentState => {
                Some("Rebuild from a clean store, or check for missing export files.")
            }
            Self::MalformedField => None,
            Self::StoreFailure => Some("Run `rumble reset` on a fresh database and re-import."),
            Self::StoreNotFound => Some("Run `rumble import` first, or point --db at an existing store."),
            Self::LockContention => Some("Retry after the other `rumble` process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fatal interpretation errors. Any of these aborts the whole import.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read export {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("empty actor ID")]
    InvalidId,

    #[error("more than 1 item mention found in text, not yet supported: {0}")]
    UnsupportedMultiItem(String),

    #[error("inconsistent channel state: {0}")]
    InconsistentState(String),

    #[error("malformed {field} value {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failure at message ID {message_id}: {source}")]
    AtMessage {
        message_id: String,
        #[source]
        source: Box<IngestError>,
    },

    #[error("failure in export {}: {source}", .path.display())]
    InExport {
        path: PathBuf,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Wrap this error with the ID of the message being interpreted.
    #[must_use]
    pub fn at_message(self, message_id: &str) -> Self {
        Self::AtMessage {
            message_id: message_id.to_string(),
            source: Box::new(self),
        }
    }

    /// Wrap this error with the export file it originated from.
    #[must_use]
    pub fn in_export(self, path: impl Into<PathBuf>) -> Self {
        Self::InExport {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Machine-readable code of the innermost cause.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::ArchiveRead,
            Self::InvalidId => ErrorCode::InvalidId,
            Self::UnsupportedMultiItem(_) => ErrorCode::UnsupportedMultiItem,
            Self::InconsistentState(_) => ErrorCode::InconsistentState,
            Self::MalformedField { .. } => ErrorCode::MalformedField,
            Self::Store(_) => ErrorCode::StoreFailure,
            Self::AtMessage { source, .. } | Self::InExport { source, .. } => source.code(),
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
