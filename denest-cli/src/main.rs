//! Command-line interface for denest
//! Moves the chapters embedded in each story of a story database into a
//! top-level `chapters` collection, in place.
//!
//! Usage:
//!   denest [PATH] [--config `<file>`] [--output `<file>`] [--dry-run] [--format text|json]
//!          [--indent `<n>`] [--default-created-at `<timestamp>`] [--no-atomic] [-v...]
//!
//! Settings resolve in this order, later wins: built-in defaults, the
//! `--config` file, `DENEST_*` environment variables, command-line flags.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use denest_config::{ConfigError, DenestConfig, Loader, ReportFormat};
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let config = load_config(&matches).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = handle_migrate(&config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("denest")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Move chapters embedded in stories into a top-level chapters collection")
        .arg(
            Arg::new("path")
                .help("Path to the story database (default: db.json)")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file layered over the defaults"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the migrated document here instead of over PATH"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Report format")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("indent")
                .long("indent")
                .help("Spaces per indentation level in the written document")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("default-created-at")
                .long("default-created-at")
                .value_name("TIMESTAMP")
                .help("createdAt for chapters whose story has none"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Report what would change without writing anything")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-atomic")
                .long("no-atomic")
                .help("Overwrite the target directly instead of via a temporary file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log progress to stderr (repeat for more detail)")
                .action(ArgAction::Count),
        )
}

/// RUST_LOG wins over -v; logs go to stderr so stdout only carries the report.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<DenestConfig, ConfigError> {
    let mut loader = Loader::new();
    if let Some(file) = matches.get_one::<String>("config") {
        loader = loader.with_file(file);
    }
    loader = loader.with_environment();

    if let Some(path) = matches.get_one::<String>("path") {
        loader = loader.set_override("document.location", path.as_str())?;
    }
    if let Some(output) = matches.get_one::<String>("output") {
        loader = loader.set_override("document.output", output.as_str())?;
    }
    if let Some(indent) = matches.get_one::<u32>("indent") {
        loader = loader.set_override("document.indent", i64::from(*indent))?;
    }
    if let Some(timestamp) = matches.get_one::<String>("default-created-at") {
        loader = loader.set_override("migration.default_created_at", timestamp.as_str())?;
    }
    if let Some(format) = matches.get_one::<String>("format") {
        loader = loader.set_override("report.format", format.as_str())?;
    }
    if matches.get_flag("dry-run") {
        loader = loader.set_override("migration.dry_run", true)?;
    }
    if matches.get_flag("no-atomic") {
        loader = loader.set_override("document.atomic_write", false)?;
    }
    loader.build()
}

/// Run the migration and print its report
fn handle_migrate(config: &DenestConfig) -> denest::Result<()> {
    let migration = config.migration();
    let outcome = migration.run()?;
    let target = migration.store().target();

    match config.report.format {
        ReportFormat::Text => {
            print!("{}", outcome.report);
            if outcome.persisted {
                println!("Migration successful.");
            } else {
                println!("Dry run: {} left unchanged.", target.display());
            }
        }
        ReportFormat::Json => {
            let mut payload = serde_json::json!({
                "dry_run": !outcome.persisted,
                "location": migration.store().location().display().to_string(),
                "target": target.display().to_string(),
                "appended": outcome.report.appended(),
                "skipped": outcome.report.skipped(),
                "report": outcome.report,
            });
            if !outcome.persisted {
                payload["document"] = outcome.document.to_value();
            }
            let rendered = serde_json::to_string_pretty(&payload).unwrap_or_else(|e| {
                eprintln!("Error formatting report: {}", e);
                std::process::exit(1);
            });
            println!("{}", rendered);
        }
    }
    Ok(())
}
