//! firmsim: firmware-pair similarity scoring and batch evaluation
//!
//! Scores pairs of pre-extracted firmware feature directories and evaluates
//! the scores against a labeled dataset.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use firmsim::{
    cli,
    config::{
        discover_config_file, load_config_file, user_config_dir, AppConfig, ConfigOverrides,
        ExecutorKind, CONFIG_FILE_NAMES,
    },
};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "firmsim")]
#[command(version)]
#[command(about = "Firmware-pair similarity scoring and batch evaluation", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Compare two firmware feature directories
    firmsim compare data/fw_a data/fw_b

    # Only run two modules and print a JSON line
    firmsim compare data/fw_a data/fw_b --modules binwalk,param_chain --json

    # Evaluate every dataset base against the corpus
    firmsim batch --data-dir data --dataset labels.csv --workers 8

    # Re-score stored results at another threshold
    firmsim evaluate --dataset labels.csv --similarity-threshold 0.6 --reweight")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Arguments for the `compare` subcommand
#[derive(Parser)]
struct CompareArgs {
    /// Feature directory of the first firmware
    firmware1: PathBuf,

    /// Feature directory of the second firmware
    firmware2: PathBuf,

    /// Sub-directory name under output_json/ for the first firmware (auto-detected)
    #[arg(long)]
    firmware1_dir: Option<String>,

    /// Sub-directory name under output_json/ for the second firmware (auto-detected)
    #[arg(long)]
    firmware2_dir: Option<String>,

    /// Directory receiving the per-comparison result directory
    #[arg(long, alias = "output_dir")]
    output_dir: Option<PathBuf>,

    /// Comma-separated modules to run (overrides the enabled set)
    #[arg(long)]
    modules: Option<String>,

    /// Score at or above which the pair is reported as similar
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// Do not write any result files
    #[arg(long)]
    no_persist: bool,

    /// Print a single JSON line instead of the text report
    #[arg(long)]
    json: bool,
}

/// Arguments for the `batch` subcommand
#[derive(Parser)]
struct BatchArgs {
    /// Directory whose sub-directories form the firmware corpus
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Labeled dataset CSV
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// How each comparison runs
    #[arg(long, value_enum)]
    executor: Option<ExecutorArg>,

    /// Directory holding per-comparison results
    #[arg(long)]
    result_dir: Option<PathBuf>,

    /// Directory for batch logs and summaries
    #[arg(long)]
    logs_dir: Option<PathBuf>,

    /// Score at or above which a pair is predicted similar
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// Comma-separated modules to run (overrides the enabled set)
    #[arg(long)]
    modules: Option<String>,
}

/// Arguments for the `evaluate` subcommand
#[derive(Parser)]
struct EvaluateArgs {
    /// Labeled dataset CSV
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Directory holding per-comparison results
    #[arg(long)]
    result_dir: Option<PathBuf>,

    /// Score at or above which a pair is predicted similar
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// Recompute totals from stored module scores with the configured weights
    #[arg(long)]
    reweight: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// List every evaluated pair
    #[arg(long)]
    show_pairs: bool,

    /// Also write the JSON report to this file
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExecutorArg {
    Subprocess,
    InProcess,
}

impl From<ExecutorArg> for ExecutorKind {
    fn from(arg: ExecutorArg) -> Self {
        match arg {
            ExecutorArg::Subprocess => Self::Subprocess,
            ExecutorArg::InProcess => Self::InProcess,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two firmware feature directories
    Compare(CompareArgs),

    /// Compare every dataset base against the corpus and score the predictions
    Batch(BatchArgs),

    /// Score stored comparison results against the dataset
    Evaluate(EvaluateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .firmsim.yaml in the current directory
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before logging starts so batch runs know their log directory.
    let config_path = discover_config_file(cli.config.as_deref());
    let (file_config, load_error) = match config_path.as_deref().map(load_config_file) {
        Some(Ok(config)) => (config, None),
        Some(Err(e)) => (AppConfig::default(), Some(e)),
        None => (AppConfig::default(), None),
    };

    let batch_log = match cli.command {
        Commands::Batch(ref args) => Some(batch_log_file(
            args.logs_dir.as_deref().unwrap_or(&file_config.output.logs_dir),
        )?),
        _ => None,
    };

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(batch_log.map(|file| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        }))
        .init();

    let loaded_from = match (config_path, load_error) {
        (Some(path), Some(e)) => {
            tracing::warn!("Failed to load config from {}: {e}; using defaults", path.display());
            None
        }
        (Some(path), None) => {
            tracing::debug!("Loaded config from {}", path.display());
            Some(path)
        }
        (None, _) => None,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Compare(args) => {
            let config = merged(
                file_config,
                &ConfigOverrides {
                    similarity_threshold: args.similarity_threshold,
                    result_dir: args.output_dir,
                    no_persist: args.no_persist,
                    ..ConfigOverrides::default()
                },
            )?;
            cli::run_compare(
                &config,
                cli::CompareOptions {
                    firmware1: args.firmware1,
                    firmware2: args.firmware2,
                    firmware1_dir: args.firmware1_dir,
                    firmware2_dir: args.firmware2_dir,
                    modules: args.modules.as_deref().map(cli::parse_module_list),
                    json: args.json,
                },
            )
        }

        Commands::Batch(args) => {
            let config = merged(
                file_config,
                &ConfigOverrides {
                    similarity_threshold: args.similarity_threshold,
                    result_dir: args.result_dir,
                    logs_dir: args.logs_dir,
                    workers: args.workers,
                    data_dir: args.data_dir,
                    dataset: args.dataset,
                    executor: args.executor.map(ExecutorKind::from),
                    ..ConfigOverrides::default()
                },
            )?;
            let exit_code = cli::run_batch(
                config,
                cli::BatchOptions {
                    config_file: loaded_from,
                    modules: args.modules.as_deref().map(cli::parse_module_list),
                },
            )?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }

        Commands::Evaluate(args) => {
            let config = merged(
                file_config,
                &ConfigOverrides {
                    similarity_threshold: args.similarity_threshold,
                    result_dir: args.result_dir,
                    dataset: args.dataset,
                    ..ConfigOverrides::default()
                },
            )?;
            cli::run_evaluate(
                &config,
                &cli::EvaluateOptions {
                    reweight: args.reweight,
                    json: args.json,
                    show_pairs: args.show_pairs,
                    output_file: args.output_file,
                },
            )
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "firmsim", &mut io::stdout());
            Ok(())
        }

        Commands::ConfigSchema { output } => {
            let schema = firmsim::config::generate_json_schema();
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => {
                    println!("{schema}");
                }
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml =
                    serde_yaml_ng::to_string(&file_config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(())
            }
            ConfigAction::Path => {
                let search_paths: [Option<String>; 3] = [
                    std::env::current_dir()
                        .ok()
                        .map(|p| p.display().to_string()),
                    user_config_dir().map(|p| p.display().to_string()),
                    dirs::home_dir().map(|p| p.display().to_string()),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {path}");
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match loaded_from {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                Ok(())
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".firmsim.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                let content = firmsim::config::generate_full_example_config();
                std::fs::write(&target, content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(())
            }
        },
    }
}

/// Apply overrides and validate.
fn merged(mut config: AppConfig, overrides: &ConfigOverrides) -> Result<AppConfig> {
    config.merge(overrides);
    cli::ensure_valid(&config)?;
    Ok(config)
}

/// `<logs_dir>/batch_comparison_main_<timestamp>.log`
fn batch_log_file(logs_dir: &Path) -> Result<File> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create {}", logs_dir.display()))?;
    let path = logs_dir.join(format!(
        "batch_comparison_main_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    File::create(&path).with_context(|| format!("failed to create {}", path.display()))
}
