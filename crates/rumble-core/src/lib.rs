//! rumble-core library.
//!
//! Rebuilds game-session history of the Rumble Royale bot from chat
//! export archives: [`archive`] finds and orders exports, [`interpret`]
//! replays messages through the per-channel state machine, and [`db`]
//! holds the SQLite store the results land in. [`ingest`] ties them
//! together for a full import.
//!
//! # Conventions
//!
//! - **Errors**: interpretation failures are [`error::IngestError`]; store
//!   setup and dumping use `anyhow::Result`.
//! - **Logging**: use `tracing` macros with structured fields.

pub mod archive;
pub mod config;
pub mod db;
pub mod discord;
pub mod error;
pub mod ingest;
pub mod interpret;
pub mod lock;
pub mod model;

pub use error::{ErrorCode, IngestError};
pub use ingest::{IngestOptions, IngestReport, ingest};
