use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use dropsort::Config;

mod inspect;
mod run;

/// Watch a drop directory and sort incoming files by extension
#[derive(Parser, Debug)]
#[command(name = "dropsort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output (error reports go to the log instead)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Where the configuration comes from, plus command-line overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (defaults to the user config dir, then built-in defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input directory (default: ~/Desktop/in)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output root; lanes go to <OUTPUT>/csv and <OUTPUT>/txt (default: ~/Desktop/out)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Maximum files admitted per poll
    #[arg(long)]
    pub max_per_poll: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the input directory and route files until interrupted
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Show which lane each file name would be routed to
    Route {
        /// File names or paths
        #[arg(required = true)]
        names: Vec<String>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output JSON instead of TOML
        #[arg(long)]
        json: bool,

        /// Write the effective configuration to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub async fn run(cli: Cli) -> Result<()> {
    if cli.quiet {
        dropsort::output::set_quiet(true);
    }

    match cli.command {
        Commands::Run { config, once } => {
            let config = resolve_config(&config)?;
            run::run(config, once, cli.quiet).await
        }
        Commands::Route { names, json } => inspect::route(&names, json),
        Commands::Config { config, json, save } => {
            let config = resolve_config(&config)?;
            inspect::show_config(&config, json, save.as_deref())
        }
    }
}

/// Default config file location: `<config dir>/dropsort/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dropsort").join("config.toml"))
}

/// Build the configuration from file, defaults and flags
///
/// This is the only place that looks at the home directory or the current
/// directory; the pipeline receives absolute paths.
pub fn resolve_config(args: &ConfigArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => Config::load(&path)?,
            None => {
                let home = dirs::home_dir().context("Could not find home directory")?;
                let desktop = home.join("Desktop");
                Config::with_roots(desktop.join("in"), desktop.join("out"))
            }
        },
    };

    if let Some(input) = &args.input {
        config.input_dir = absolute(input)?;
    }
    if let Some(output) = &args.output {
        let output = absolute(output)?;
        config.csv_dir = output.join("csv");
        config.txt_dir = output.join("txt");
    }
    if let Some(poll_ms) = args.poll_ms {
        config.poll_interval_ms = poll_ms;
    }
    if let Some(max) = args.max_per_poll {
        config.max_files_per_poll = max;
    }

    config.validate()?;
    Ok(config)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Could not read current directory")?;
    Ok(cwd.join(path))
}
