use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use rumble_core::config::RumbleConfig;
use rumble_core::db::open_store;
use rumble_core::lock::{DEFAULT_LOCK_TIMEOUT, StoreWriteLock, lock_path_for};
use rumble_core::{IngestOptions, IngestReport, ingest};

use crate::cmd::{resolve_path, store_path};
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_error};

/// Arguments for `rumble import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export archive root (one sub-directory per channel).
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Channel to replay; repeat to give several, in processing order.
    #[arg(long = "channel", value_name = "ID")]
    pub channels: Vec<String>,

    /// Author ID of the game bot.
    #[arg(long, value_name = "ID")]
    pub bot_author: Option<String>,

    /// Store database path.
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

impl ImportArgs {
    fn options(&self, config: &RumbleConfig, project_root: &Path) -> IngestOptions {
        let root = self.root.as_deref().unwrap_or(&config.archive.root);
        let channels = if self.channels.is_empty() {
            config.archive.channels.clone()
        } else {
            self.channels.clone()
        };
        IngestOptions {
            root: resolve_path(project_root, root),
            channels,
            bot_author_id: self
                .bot_author
                .clone()
                .unwrap_or_else(|| config.bot.author_id.clone()),
        }
    }
}

/// Run `rumble import`: replay the archive into the store and report.
///
/// # Errors
///
/// Returns an error if the store is locked, cannot be opened, or the
/// replay hits a fatal interpretation error.
pub fn run_import(
    args: &ImportArgs,
    config: &RumbleConfig,
    output: OutputMode,
    quiet: bool,
    project_root: &Path,
) -> Result<()> {
    let options = args.options(config, project_root);
    let db_path = store_path(args.db.as_deref(), config, project_root);

    let _lock = match StoreWriteLock::acquire(&lock_path_for(&db_path), DEFAULT_LOCK_TIMEOUT) {
        Ok(lock) => lock,
        Err(e) => {
            render_error(output, &(&e).into())?;
            anyhow::bail!("{e}");
        }
    };

    let conn = open_store(&db_path)?;
    tracing::info!(
        root = %options.root.display(),
        channels = options.channels.len(),
        db = %db_path.display(),
        "starting import"
    );

    let report = match ingest(&conn, &options) {
        Ok(report) => report,
        Err(e) => {
            render_error(output, &(&e).into())?;
            anyhow::bail!("import failed: {e}");
        }
    };

    if quiet && !output.is_json() {
        return Ok(());
    }
    render(output, &report, write_report)
}

fn write_report(report: &IngestReport, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    let stats = &report.stats;
    let store = &report.store;
    if mode == OutputMode::Text {
        return writeln!(
            w,
            "import: channels={} files={} empty_files={} messages={} games={} rounds={} \
             interactions={} users={} ignored={} unknown={} leftover={} elapsed_ms={}",
            report.channels,
            report.files,
            report.empty_files,
            stats.messages,
            store.games,
            store.rounds,
            store.interactions,
            store.users,
            stats.ignored,
            stats.unknown,
            stats.leftover,
            report.elapsed.as_millis()
        );
    }

    pretty_section(w, "Import")?;
    pretty_kv(w, "channels", report.channels.to_string())?;
    pretty_kv(w, "export files", report.files.to_string())?;
    pretty_kv(w, "empty files", report.empty_files.to_string())?;
    pretty_kv(w, "messages", stats.messages.to_string())?;
    pretty_kv(w, "bot embeds", stats.bot_embeds.to_string())?;
    pretty_kv(w, "elapsed", format!("{} ms", report.elapsed.as_millis()))?;
    writeln!(w)?;

    pretty_section(w, "Replay")?;
    pretty_kv(w, "countdowns", stats.countdowns.to_string())?;
    pretty_kv(w, "games started", stats.games_started.to_string())?;
    pretty_kv(w, "games won", stats.games_won.to_string())?;
    pretty_kv(w, "games cancelled", stats.games_cancelled.to_string())?;
    pretty_kv(w, "rounds", stats.rounds.to_string())?;
    pretty_kv(w, "interactions", stats.interactions.to_string())?;
    pretty_kv(w, "name observations", stats.observations.to_string())?;
    pretty_kv(w, "backfilled rows", stats.backfilled.to_string())?;
    pretty_kv(w, "ignored", stats.ignored.to_string())?;
    pretty_kv(w, "unknown", stats.unknown.to_string())?;
    pretty_kv(w, "leftover", stats.leftover.to_string())?;
    for (rule, count) in &stats.unhandled {
        pretty_kv(w, &format!("unhandled {rule}"), count.to_string())?;
    }
    writeln!(w)?;

    pretty_section(w, "Store")?;
    pretty_kv(w, "users", store.users.to_string())?;
    pretty_kv(w, "name observations", store.name_observations.to_string())?;
    pretty_kv(w, "items", store.items.to_string())?;
    pretty_kv(w, "games", store.games.to_string())?;
    pretty_kv(w, "rounds", store.rounds.to_string())?;
    pretty_kv(w, "interaction texts", store.interaction_messages.to_string())?;
    pretty_kv(w, "interactions", store.interactions.to_string())?;
    pretty_kv(w, "mentions", store.interaction_mentions.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumble_core::db::store::StoreCounts;
    use rumble_core::interpret::InterpretStats;
    use std::time::Duration;

    fn args() -> ImportArgs {
        ImportArgs {
            root: None,
            channels: Vec::new(),
            bot_author: None,
            db: None,
        }
    }

    #[test]
    fn options_fall_back_to_config() {
        let config = RumbleConfig::default();
        let options = args().options(&config, Path::new("/srv"));
        assert_eq!(options.root, PathBuf::from("/srv/discord-exports"));
        assert_eq!(options.channels, config.archive.channels);
        assert_eq!(options.bot_author_id, config.bot.author_id);
    }

    #[test]
    fn flags_override_config() {
        let config = RumbleConfig::default();
        let mut args = args();
        args.root = Some(PathBuf::from("/data/exports"));
        args.channels = vec!["9".into(), "8".into()];
        args.bot_author = Some("BOT".into());
        let options = args.options(&config, Path::new("/srv"));
        assert_eq!(options.root, PathBuf::from("/data/exports"));
        assert_eq!(options.channels, vec!["9".to_string(), "8".to_string()]);
        assert_eq!(options.bot_author_id, "BOT");
    }

    #[test]
    fn text_report_is_one_line() {
        let stats = InterpretStats {
            messages: 12,
            unknown: 1,
            ..InterpretStats::default()
        };
        let report = IngestReport {
            channels: 2,
            files: 3,
            empty_files: 0,
            stats,
            store: StoreCounts {
                games: 1,
                rounds: 4,
                ..StoreCounts::default()
            },
            elapsed: Duration::from_millis(7),
        };
        let mut buf = Vec::new();
        write_report(&report, OutputMode::Text, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("files=3"));
        assert!(text.contains("messages=12"));
        assert!(text.contains("games=1 rounds=4"));
        assert!(text.contains("unknown=1"));
    }

    #[test]
    fn pretty_report_lists_unhandled_rules() {
        let mut stats = InterpretStats::default();
        stats.unhandled.insert("game-summary".into(), 2);
        let report = IngestReport {
            channels: 1,
            files: 1,
            empty_files: 0,
            stats,
            store: StoreCounts::default(),
            elapsed: Duration::ZERO,
        };
        let mut buf = Vec::new();
        write_report(&report, OutputMode::Pretty, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("unhandled game-summary:"));
        assert!(text.contains("Store"));
    }
}
