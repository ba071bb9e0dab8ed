//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use biograph_core::pipeline::{ProgressReporter, RunOutcome, RunSummary};
use biograph_core::{ExtractionProfile, Resolver, assembler, run_groups};
use biograph_corpus::CorpusStore;
use biograph_knowledge::KnowledgeClient;
use biograph_publisher::{Credentials, WikiPublisher, WriteMode};
use biograph_shared::{
    AppConfig, BiographError, HomonymGroup, NameGroup, init_config, load_config,
    publisher_credentials,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// biograph — build disambiguation pages from a titled text corpus.
#[derive(Parser)]
#[command(
    name = "biograph",
    version,
    about = "Extract homonymous people from an offline corpus and build disambiguation pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Sort a raw JSON dump into the corpus data file + offset index.
    BuildIndex {
        /// Raw dump: a JSON array of records.
        input: PathBuf,

        /// Output path for the sorted data file.
        #[arg(long)]
        data: PathBuf,

        /// Output path for the byte-offset index.
        #[arg(long)]
        index: PathBuf,
    },

    /// Process name-groups against the corpus and knowledge base.
    Run {
        /// Groups file: a JSON array of `{label, names}` objects.
        #[arg(long)]
        groups: PathBuf,

        /// Only process the first N groups.
        #[arg(long)]
        limit: Option<usize>,

        /// Save accepted groups to this JSON file.
        #[arg(long)]
        save: Option<PathBuf>,

        /// Publish accepted groups to the destination wiki instead of
        /// printing them.
        #[arg(long)]
        publish: bool,
    },

    /// Publish a previously saved listing of accepted groups.
    Publish {
        /// Listing file produced by `run --save`.
        #[arg(long)]
        load: PathBuf,
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
        0 => "biograph=info",
        1 => "biograph=debug",
        _ => "biograph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::BuildIndex { input, data, index } => cmd_build_index(&input, &data, &index),
        Command::Run {
            groups,
            limit,
            save,
            publish,
        } => cmd_run(&groups, limit, save.as_deref(), publish).await,
        Command::Publish { load } => cmd_publish(&load).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// build-index
// ---------------------------------------------------------------------------

fn cmd_build_index(input: &std::path::Path, data: &std::path::Path, index: &std::path::Path) -> Result<()> {
    let report = biograph_corpus::build_index(input, data, index)?;

    println!();
    println!("  Corpus index built.");
    println!("  Indexed: {}", report.indexed);
    println!("  Dropped: {} (records without a title)", report.dropped);
    println!("  Data:    {}", data.display());
    println!("  Index:   {}", index.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    groups_path: &std::path::Path,
    limit: Option<usize>,
    save: Option<&std::path::Path>,
    publish: bool,
) -> Result<()> {
    let config = load_config()?;

    // A broken corpus means there is nothing valid to query: fail the run
    // before any group is attempted.
    let store = CorpusStore::load(
        std::path::Path::new(&config.corpus.index_path),
        std::path::Path::new(&config.corpus.data_path),
    )?
    .with_probe_cache_capacity(config.corpus.probe_cache_capacity);

    let client = KnowledgeClient::new(&config.knowledge)?;
    let resolver = Resolver::new(
        Arc::new(store),
        ExtractionProfile::default(),
        Arc::new(client),
    );

    let mut groups = load_groups(groups_path)?;
    if let Some(limit) = limit {
        groups.truncate(limit);
    }

    info!(groups = groups.len(), "processing name-groups");

    let progress = CliProgress::new(groups.len());
    let outcome: RunOutcome = run_groups(&resolver, groups, &progress).await;

    if let Some(path) = save {
        biograph_publisher::save_listing(path, &outcome.groups)?;
        println!("  Saved {} groups to {}", outcome.groups.len(), path.display());
    }

    if publish {
        // Publishing starts only after all enrichment has completed; a
        // failed login therefore loses nothing — fall back to printing.
        if let Err(e) = publish_groups(&config, &outcome.groups).await {
            warn!(error = %e, "publish phase failed; printing the listing instead");
            print_listing(&outcome.groups);
            print_summary(&outcome.summary);
            return Err(e.into());
        }
    } else {
        print_listing(&outcome.groups);
    }

    print_summary(&outcome.summary);
    Ok(())
}

/// Parse the groups file.
fn load_groups(path: &std::path::Path) -> Result<Vec<NameGroup>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read groups file {}: {e}", path.display()))?;
    let groups: Vec<NameGroup> = serde_json::from_str(&content)
        .map_err(|e| eyre!("invalid groups file {}: {e}", path.display()))?;
    Ok(groups)
}

fn print_listing(groups: &[HomonymGroup]) {
    for group in groups {
        println!("{}", assembler::render(group));
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("  Groups processed: {}", summary.groups_processed);
    println!("  Groups accepted:  {}", summary.groups_accepted);
    println!("  People resolved:  {}", summary.people_resolved);
    println!();
}

// ---------------------------------------------------------------------------
// publish
// ---------------------------------------------------------------------------

async fn cmd_publish(load: &std::path::Path) -> Result<()> {
    let config = load_config()?;
    let groups = biograph_publisher::load_listing(load)?;

    println!("  Loaded {} groups from {}", groups.len(), load.display());
    publish_groups(&config, &groups).await?;
    Ok(())
}

/// Write every accepted group to the destination wiki.
///
/// A rejected edit is reported and skipped; the remaining groups still
/// publish. Only session failures abort the phase.
async fn publish_groups(config: &AppConfig, groups: &[HomonymGroup]) -> std::result::Result<(), BiographError> {
    if groups.is_empty() {
        println!("  Nothing to publish.");
        return Ok(());
    }

    let (username, password) = publisher_credentials(config)?;
    let credentials = Credentials { username, password };
    let publisher = WikiPublisher::connect(&config.publisher.endpoint, &credentials).await?;

    let mode = if config.publisher.overwrite {
        WriteMode::Overwrite
    } else {
        WriteMode::CreateOnly
    };

    let mut written = 0usize;
    let mut failed = 0usize;

    for group in groups {
        let body = assembler::render(group);
        match publisher.write(&group.destination_title, &body, mode).await {
            Ok(()) => {
                written += 1;
                println!("  ok      {}", group.destination_title);
            }
            Err(e) => {
                failed += 1;
                println!("  failed  {} ({e})", group.destination_title);
            }
        }
    }

    println!();
    println!("  Published: {written}, failed: {failed}");
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("  Created {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("cannot serialize config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress bar fed by group completions (order not guaranteed; the bar
/// position only ever advances).
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("valid progress template"),
        );
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn group_completed(&self, completed: usize, _total: usize, label: &str, accepted: bool) {
        self.bar.set_position(completed as u64);
        if accepted {
            self.bar.set_message(format!("accepted: {label}"));
        }
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
