mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, reality::RealitySubcommand, PulseArgs};
use seed_core::pulse::CheckLevel;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "seed",
    about = "Health, drift and work status for every reality in a seed ecosystem",
    version,
    propagate_version = true
)]
struct Cli {
    /// Seed root (default: auto-detect from .seed/, model/sketch.json or .git/)
    #[arg(long, global = true, env = "SEED_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Check level: fast or verify (default: pulse.check_level from config)
    #[arg(long, global = true)]
    level: Option<CheckLevel>,

    /// Reality id reported busy by an external tracker (repeatable)
    #[arg(long, global = true, value_name = "ID")]
    busy: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .seed/config.yaml in the seed root
    Init,

    /// Pulse every reality and show the ecosystem status
    Status {
        /// Show per-reality hash and error details
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Exit non-zero unless the overall status is green
        #[arg(long)]
        strict: bool,
    },

    /// Pulse a single reality
    Check {
        /// Reality id or label
        reality: String,
    },

    /// Verify declared source hashes against the files on disk
    Verify {
        /// List every check, not only failures
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Restrict to one reality (id or label)
        #[arg(long)]
        reality: Option<String>,
    },

    /// Accept drift: rewrite a reality's declared hashes to match disk
    Rehash {
        /// Reality id or label
        reality: String,
    },

    /// Inspect registered realities
    Reality {
        #[command(subcommand)]
        subcommand: RealitySubcommand,
    },

    /// Pulse repeatedly, printing one summary line per cycle
    Watch {
        /// Seconds between cycles (default: pulse.poll_interval_seconds)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many cycles
        #[arg(long)]
        iterations: Option<u64>,

        /// Write each snapshot as JSON (default path: output/status.json)
        #[arg(
            long,
            value_name = "PATH",
            num_args = 0..=1,
            default_missing_value = seed_core::paths::DEFAULT_SNAPSHOT_FILE
        )]
        write: Option<PathBuf>,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Watch { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let pulse = PulseArgs {
        level: cli.level,
        busy: cli.busy,
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Status { verbose, strict } => {
            cmd::status::run(&root, &pulse, verbose, strict, cli.json)
        }
        Commands::Check { reality } => cmd::check::run(&root, &pulse, &reality, cli.json),
        Commands::Verify { verbose, reality } => {
            cmd::verify::run(&root, reality.as_deref(), verbose, cli.json)
        }
        Commands::Rehash { reality } => cmd::rehash::run(&root, &reality, cli.json),
        Commands::Reality { subcommand } => cmd::reality::run(&root, subcommand, cli.json),
        Commands::Watch {
            interval,
            iterations,
            write,
        } => cmd::watch::run(&root, &pulse, interval, iterations, write.as_deref(), cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
