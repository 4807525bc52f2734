use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::SecondsFormat;
use clap::Args;
use rumble_core::ErrorCode;
use rumble_core::config::RumbleConfig;
use rumble_core::db::dump::{DumpReport, write_dump};
use rumble_core::db::open_store_read_only;
use rumble_core::lock::{DEFAULT_LOCK_TIMEOUT, StoreReadLock, lock_path_for};
use serde::Serialize;

use crate::cmd::{resolve_path, store_path};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render, render_error};

/// Arguments for `rumble dump`.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Write the dump to this file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Store database path.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DumpSummary {
    path: String,
    tables: usize,
    rows: usize,
    latest_activity: Option<String>,
}

impl DumpSummary {
    fn new(path: &Path, report: &DumpReport) -> Self {
        Self {
            path: path.display().to_string(),
            tables: report.table_count,
            rows: report.row_count,
            latest_activity: report
                .latest_activity
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// Run `rumble dump`: write the store as SQL text.
///
/// With `--output` a summary is rendered after the file is written; without
/// it stdout carries only the SQL.
///
/// # Errors
///
/// Returns an error if the store is missing or locked, or writing fails.
pub fn run_dump(
    args: &DumpArgs,
    config: &RumbleConfig,
    output: OutputMode,
    quiet: bool,
    project_root: &Path,
) -> Result<()> {
    let db_path = store_path(args.db.as_deref(), config, project_root);
    if !db_path.exists() {
        let code = ErrorCode::StoreNotFound;
        render_error(
            output,
            &CliError::with_details(
                format!("{}: {}", code.message(), db_path.display()),
                code.hint().unwrap_or_default(),
                code.code(),
            ),
        )?;
        anyhow::bail!("store database not found: {}", db_path.display());
    }

    let _lock = match StoreReadLock::acquire(&lock_path_for(&db_path), DEFAULT_LOCK_TIMEOUT) {
        Ok(lock) => lock,
        Err(e) => {
            render_error(output, &(&e).into())?;
            anyhow::bail!("{e}");
        }
    };
    let conn = open_store_read_only(&db_path)?;

    let Some(target) = args.output.as_deref() else {
        let stdout = io::stdout();
        let report = write_dump(&conn, &mut stdout.lock())?;
        tracing::info!(tables = report.table_count, rows = report.row_count, "dump written");
        return Ok(());
    };

    let target = resolve_path(project_root, target);
    let file = File::create(&target)
        .with_context(|| format!("create dump file {}", target.display()))?;
    let mut writer = BufWriter::new(file);
    let report = write_dump(&conn, &mut writer)?;
    writer
        .into_inner()
        .map_err(io::IntoInnerError::into_error)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("finish dump file {}", target.display()))?;

    if quiet && !output.is_json() {
        return Ok(());
    }
    render(output, &DumpSummary::new(&target, &report), write_summary)
}

fn write_summary(summary: &DumpSummary, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    let latest = summary.latest_activity.as_deref().unwrap_or("none");
    if mode == OutputMode::Text {
        return writeln!(
            w,
            "dump: path={} tables={} rows={} latest={latest}",
            summary.path, summary.tables, summary.rows
        );
    }
    pretty_section(w, "Dump")?;
    pretty_kv(w, "file", &summary.path)?;
    pretty_kv(w, "tables", summary.tables.to_string())?;
    pretty_kv(w, "rows", summary.rows.to_string())?;
    pretty_kv(w, "latest activity", latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn summary_formats_latest_activity() {
        let report = DumpReport {
            table_count: 9,
            row_count: 40,
            latest_activity: Utc.timestamp_opt(1_711_929_600, 0).single(),
        };
        let summary = DumpSummary::new(Path::new("/tmp/out.sql"), &report);
        assert_eq!(summary.latest_activity.as_deref(), Some("2024-04-01T00:00:00Z"));

        let mut buf = Vec::new();
        write_summary(&summary, OutputMode::Text, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(
            text,
            "dump: path=/tmp/out.sql tables=9 rows=40 latest=2024-04-01T00:00:00Z\n"
        );
    }
}
