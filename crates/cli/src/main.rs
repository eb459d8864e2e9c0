use std::{fs::File, io::stderr, path::PathBuf};

use clap::{ArgAction, Parser};
use commands::{profile::ProfileCommands, Commands};
use lineage_telemetry::TelemetryConfig;
use tracing::{debug, info, warn};

mod commands;
mod config;
pub mod output;

pub use self::config::Options;
use crate::config::{Config, KnownDirs};

#[derive(Parser)]
#[command(
    name = "lineage",
    version,
    about = "Inspect and check extensions for the lineage mod host",
    propagate_version = true,
    flatten_help = true
)]
struct Cli {
    #[clap(flatten)]
    config: Options,

    /// Only print errors.
    #[clap(short, long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Read configuration from this file after the default search paths.
    #[clap(long)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    lineage_telemetry::install_error_handler();

    let cli = Cli::parse();

    let known_dirs = KnownDirs::default();
    let config_sources: Vec<PathBuf> = known_dirs
        .config_dirs()
        .map(|dir| dir.join("lineage.toml"))
        .chain(cli.config_file.clone())
        .collect();

    let (options, config_errors) = Options::from_files(&config_sources);
    let options = options.merge(cli.config);

    let config = Config {
        known_dirs,
        options,
    };

    let default_filter = if cli.quiet {
        "error"
    } else {
        "warn,lineage=info,name_every_child=info"
    };

    let mut telemetry_config = TelemetryConfig::default()
        .enabled(config.options.crash_reporting.unwrap_or(false))
        .with_default_filter(default_filter)
        .with_console_writer(stderr);

    if let Some(log_file) = &config.options.log_file {
        match File::create(log_file) {
            Ok(file) => telemetry_config = telemetry_config.with_file_writer(file),
            Err(error) => eprintln!("unable to open log file {log_file:?}: {error}"),
        }
    }

    let _telemetry_guard = lineage_telemetry::install(telemetry_config);

    info!(version = env!("CARGO_PKG_VERSION"));

    // Configuration is read before logging exists, so its diagnostics are replayed here.
    debug!(paths = ?config_sources, "searched for configuration in");

    for error in &config_errors {
        error.log();
    }

    if let Some(path) = cli.config_file.as_ref().filter(|path| !path.exists()) {
        warn!(?path, "configuration file does not exist");
    }

    if !config.options.disabled_extensions.is_empty() {
        warn!(disabled = ?config.options.disabled_extensions, "extensions disabled by configuration");
    }

    let result = lineage_telemetry::with_root_span("lineage", "run command", || match cli.command {
        Commands::Info => commands::info::info(config),
        Commands::Extensions(args) => commands::extensions::list(args),
        Commands::Profile(ProfileCommands::Create(args)) => commands::profile::create(config, args),
        Commands::Profile(ProfileCommands::List) => commands::profile::list(config),
        Commands::Profile(ProfileCommands::Show { name }) => commands::profile::show(config, name),
        Commands::Check(args) => commands::check::check(config, args),
    });

    if result.is_err() {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::Cli;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
