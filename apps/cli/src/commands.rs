//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lessonpath_completion::OpenRouterClient;
use lessonpath_core::pipeline::{EnrichmentProgress, PipelineConfig, run_pipeline};
use lessonpath_core::report::QualityReport;
use lessonpath_core::snapshot::{load_dataset, load_snapshot, write_snapshot};
use lessonpath_shared::{
    AppConfig, ModelProfile, init_config, load_config, load_config_from, resolve_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lessonpath: turn raw video metadata into a connected learning roadmap.
#[derive(Parser)]
#[command(
    name = "lessonpath",
    version,
    about = "Enrich educational video datasets with topics, prerequisites, and learning pathways.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.lessonpath/lessonpath.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich a video dataset and write the enhanced snapshot.
    Enrich {
        /// Input JSON: `{"metadata": ..., "videos": [...]}` or a bare array.
        input: PathBuf,

        /// Output snapshot path.
        #[arg(short, long, default_value = "enhanced_learning_data.json")]
        output: PathBuf,

        /// Items per batch before the longer pause (overrides config).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Model profile for every call: fast, balanced, smart, vision, long_context
        /// (overrides config).
        #[arg(long)]
        profile: Option<ModelProfile>,

        /// Skip learning pathway synthesis.
        #[arg(long)]
        no_pathways: bool,
    },

    /// Print the quality report for an existing snapshot.
    Report {
        /// Snapshot written by `enrich`.
        snapshot: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "lessonpath=info",
        1 => "lessonpath=debug",
        _ => "lessonpath=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Enrich {
            input,
            output,
            batch_size,
            profile,
            no_pathways,
        } => {
            let overrides = EnrichOverrides {
                batch_size,
                profile,
                no_pathways,
            };
            cmd_enrich(config_path.as_deref(), &input, &output, &overrides).await
        }
        Command::Report { snapshot } => cmd_report(&snapshot),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// `enrich` flags that take precedence over the config file.
#[derive(Debug)]
struct EnrichOverrides {
    batch_size: Option<usize>,
    profile: Option<ModelProfile>,
    no_pathways: bool,
}

impl EnrichOverrides {
    fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(size) = self.batch_size {
            if size == 0 {
                return Err(eyre!("--batch-size must be at least 1"));
            }
            config.pacing.batch_size = size;
        }
        if let Some(profile) = self.profile {
            config.enrichment.topic_profile = profile;
            config.enrichment.prerequisites_profile = profile;
            config.enrichment.pathway_profile = profile;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    overrides: &EnrichOverrides,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;

    // Missing credentials halt before any input is read.
    let api_key = resolve_api_key(&config)?;

    overrides.apply(&mut config)?;

    let dataset = load_dataset(input)?;
    let client = OpenRouterClient::new(&api_key, &config.openrouter, config.models.clone())?;

    let mut pipeline_config = PipelineConfig::from_app_config(&config);
    if overrides.no_pathways {
        pipeline_config.pathways = None;
    }

    info!(
        input = %input.display(),
        videos = dataset.videos.len(),
        topic_model = %config.models.resolve(config.enrichment.topic_profile),
        prerequisites_model = %config.models.resolve(config.enrichment.prerequisites_profile),
        "enriching dataset"
    );

    let progress = CliProgress::new();
    let result = run_pipeline(&pipeline_config, &client, dataset, &progress).await;
    progress.finish();

    write_snapshot(output, &result.snapshot)?;

    let summary = &result.summary;
    println!();
    println!("  Enrichment complete");
    println!("  Run:        {}", result.snapshot.metadata.run_id);
    println!("  Processed:  {}", summary.processed);
    println!("  Failed:     {}", summary.failed);
    println!("  LLM calls:  {}", summary.live_calls);
    println!(
        "  Cache:      {} hits / {} misses",
        summary.cache_hits, summary.cache_misses
    );
    println!("  Output:     {}", output.display());
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    for (video_id, reason) in &summary.failures {
        println!("  ! {video_id}: {reason}");
    }
    println!();
    print!("{}", result.report);

    Ok(())
}

fn cmd_report(snapshot: &Path) -> Result<()> {
    let snapshot = load_snapshot(snapshot)?;
    let report = QualityReport::from_run(&snapshot.videos, &snapshot.learning_pathways);
    println!("Run {} ({})", snapshot.metadata.run_id, snapshot.metadata.processing_date.to_rfc3339());
    print!("{report}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner that mirrors pipeline phases and per-item progress.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EnrichmentProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {detail}"));
    }
}
