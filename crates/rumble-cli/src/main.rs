#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use rumble_core::ErrorCode;
use rumble_core::config::{RumbleConfig, load_config, load_config_file, resolve_output};
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "rumble: rebuild Rumble Royale game history from chat exports",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Read configuration from this file instead of ./rumble.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "History",
        about = "Replay chat exports into the store",
        long_about = "Replay every configured channel's chat exports in time order and record games, rounds, interactions and player names.",
        after_help = "EXAMPLES:\n    # Import the channels listed in rumble.toml\n    rumble import\n\n    # Import one channel from another archive\n    rumble import --root /data/exports --channel 1224017701744410695\n\n    # Emit machine-readable output\n    rumble import --json"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "History",
        about = "Write the store as SQL",
        long_about = "Write an SQLite-compatible SQL dump of the store, headed by the latest game time it covers.",
        after_help = "EXAMPLES:\n    # Dump to stdout\n    rumble dump > history.sql\n\n    # Dump to a file and print a summary\n    rumble dump --output history.sql"
    )]
    Dump(cmd::dump::DumpArgs),

    #[command(
        next_help_heading = "Store Maintenance",
        about = "Migrate the store schema and print it",
        long_about = "Create or migrate the store schema to the latest version and print the schema SQL.",
        after_help = "EXAMPLES:\n    # Migrate in place\n    rumble reset\n\n    # Start over from an empty store\n    rumble reset --wipe"
    )]
    Reset(cmd::reset::ResetArgs),

    #[command(
        next_help_heading = "Store Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    rumble completions bash\n\n    # Generate zsh completions\n    rumble completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUMBLE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "rumble=debug,info"
        } else {
            "rumble=info,warn"
        })
    });

    let format = env::var("RUMBLE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// `--config` must exist; the implicit `./rumble.toml` is optional.
fn load_cli_config(cli: &Cli, project_root: &Path) -> anyhow::Result<RumbleConfig> {
    let loaded = cli.config.as_deref().map_or_else(
        || load_config(project_root),
        |path| load_config_file(path, true),
    );
    match loaded {
        Ok(config) => Ok(config),
        Err(e) => {
            let output = OutputMode::from_resolved(&resolve_output(
                cli.json,
                &RumbleConfig::default(),
            ));
            let code = ErrorCode::ConfigParseError;
            render_error(
                output,
                &CliError::with_details(
                    format!("{e:#}"),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            Err(e)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = load_cli_config(&cli, &project_root)?;
    let output = OutputMode::from_resolved(&resolve_output(cli.json, &config));

    match cli.command {
        Commands::Import(ref args) => {
            cmd::import::run_import(args, &config, output, cli.quiet, &project_root)
        }
        Commands::Dump(ref args) => {
            cmd::dump::run_dump(args, &config, output, cli.quiet, &project_root)
        }
        Commands::Reset(ref args) => cmd::reset::run_reset(args, &config, output, &project_root),
        Commands::Completions(ref args) => {
            cmd::completions::run_completions(args.shell, &mut Cli::command())
        }
    }
}
