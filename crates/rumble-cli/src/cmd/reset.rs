use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use rumble_core::config::RumbleConfig;
use rumble_core::db::dump::write_schema;
use rumble_core::db::{open_store, remove_store};
use rumble_core::lock::{DEFAULT_LOCK_TIMEOUT, StoreWriteLock, lock_path_for};

use crate::cmd::store_path;
use crate::output::{OutputMode, render_error};

/// Arguments for `rumble reset`.
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Delete the existing store before recreating the schema.
    #[arg(long)]
    pub wipe: bool,

    /// Store database path.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Run `rumble reset`: bring the store schema up to date and print it.
///
/// # Errors
///
/// Returns an error if the store is locked, cannot be removed or migrated,
/// or the schema cannot be written to stdout.
pub fn run_reset(
    args: &ResetArgs,
    config: &RumbleConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let db_path = store_path(args.db.as_deref(), config, project_root);
    let _lock = match StoreWriteLock::acquire(&lock_path_for(&db_path), DEFAULT_LOCK_TIMEOUT) {
        Ok(lock) => lock,
        Err(e) => {
            render_error(output, &(&e).into())?;
            anyhow::bail!("{e}");
        }
    };

    if args.wipe {
        tracing::warn!(db = %db_path.display(), "wiping store");
        remove_store(&db_path)?;
    }

    let conn = open_store(&db_path)?;
    tracing::info!(db = %db_path.display(), "store schema is current");
    write_schema(&conn, &mut io::stdout().lock())
}
