//! posix-argv - POSIX/GNU-style argument parsing for shell scripts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use posix_argv::output::{
    generate_error_json, generate_error_output, generate_help_output, generate_json,
    generate_output, generate_version_output,
};
use posix_argv::{generate_help, generate_version, ArgvParser, Config};
use std::io;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "POSIX_ARGV_LOG";

/// POSIX/GNU-style argument parsing for shell scripts.
#[derive(Parser, Debug)]
#[command(name = "posix-argv", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// How parse results are written.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Format {
    /// Path of a sourceable script of export statements
    #[default]
    Shell,
    /// JSON document on stdout
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse script arguments and output environment variables
    Parse {
        /// JSON configuration for the target script
        #[arg(long)]
        config: String,

        /// Environment variable prefix (overrides config)
        #[arg(long)]
        prefix: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Shell)]
        format: Format,

        /// Arguments to parse for the target script
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print help text for the target script
    Help {
        /// JSON configuration for the target script
        #[arg(long)]
        config: String,

        /// Write a sourceable script instead of plain text
        #[arg(long)]
        script: bool,
    },

    /// Print version of the target script
    Version {
        /// JSON configuration for the target script
        #[arg(long)]
        config: String,

        /// Write a sourceable script instead of plain text
        #[arg(long)]
        script: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn load(config: &str) -> Result<(Config, ArgvParser)> {
    let cfg = Config::from_json(config).context("failed to parse config JSON")?;
    let parser = cfg.build().context("invalid config")?;
    Ok((cfg, parser))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            config,
            prefix,
            format,
            args,
        } => {
            let (cfg, parser) = load(&config)?;
            let effective_prefix = prefix.as_deref().unwrap_or_else(|| cfg.effective_prefix());
            debug!(args = args.len(), ?format, "parsing");

            match (parser.parse_blocking(&args), format) {
                (Ok(result), Format::Shell) => {
                    let path = generate_output(&result, effective_prefix)
                        .context("failed to generate output file")?;
                    println!("{}", path.display());
                }
                (Ok(result), Format::Json) => {
                    println!("{}", generate_json(&result)?);
                }
                (Err(errors), Format::Shell) => {
                    let program = parser.settings().program_name();
                    let path = generate_error_output(&program, &errors)
                        .context("failed to generate error file")?;
                    println!("{}", path.display());
                }
                (Err(errors), Format::Json) => {
                    println!("{}", generate_error_json(&errors)?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Help { config, script } => {
            let (_, parser) = load(&config)?;
            if script {
                let path = generate_help_output(&generate_help(&parser))
                    .context("failed to generate help file")?;
                println!("{}", path.display());
            } else {
                parser
                    .print_help(&mut io::stdout())
                    .context("failed to write help")?;
            }
        }
        Commands::Version { config, script } => {
            let (cfg, parser) = load(&config)?;
            let version = cfg.version.as_deref().context("config has no version")?;
            if script {
                let path = generate_version_output(&generate_version(&parser, version))
                    .context("failed to generate version file")?;
                println!("{}", path.display());
            } else {
                parser
                    .print_version(version, &mut io::stdout())
                    .context("failed to write version")?;
            }
        }
    }

    Ok(())
}
