//! ParlamentoDB ETL - command line entry point

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use parlamento_common::logging::{init_logging, LogConfig, LogLevel};
use parlamento_common::EntityType;
use parlamento_etl::config::EtlConfig;
use parlamento_etl::orchestrator::{Orchestrator, RunReport, RunSelection};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "parlamento-etl")]
#[command(author, version, about = "Portuguese Parliament ETL pipeline (JSON -> Parquet)")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch raw documents and produce columnar artifacts
    Run {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Re-download raw documents even if they are already cached
        #[arg(long)]
        force: bool,
    },

    /// Download raw documents only (bronze tier)
    Fetch {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Re-download raw documents even if they are already cached
        #[arg(long)]
        force: bool,
    },

    /// Produce columnar artifacts from existing raw documents, no network
    Transform {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Legislature(s) to process, e.g. "L17" or "L17,L16" (default: all)
    #[arg(short = 'l', long, value_delimiter = ',')]
    legislatures: Option<Vec<String>>,

    /// Entity type(s) to skip, e.g. "iniciativas" for a faster run
    #[arg(long, value_delimiter = ',')]
    skip: Vec<EntityType>,

    /// Root directory for the bronze/silver data tiers
    #[arg(long, env = "PARLAMENTO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Source base URL override
    #[arg(long, env = "PARLAMENTO_BASE_URL")]
    base_url: Option<String>,
}

impl SelectionArgs {
    fn into_parts(self, force: bool) -> (RunSelection, Option<PathBuf>, Option<String>) {
        let entities: Vec<EntityType> = EntityType::ALL
            .into_iter()
            .filter(|entity| !self.skip.contains(entity))
            .collect();
        let selection = RunSelection {
            legislatures: self.legislatures,
            entities,
            force,
        };
        (selection, self.data_dir, self.base_url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    log_config.log_file_prefix = "parlamento-etl".to_string();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    let (selection, data_dir, base_url, command) = match cli.command {
        Command::Run { selection, force } => {
            let (s, d, b) = selection.into_parts(force);
            (s, d, b, Mode::Run)
        }
        Command::Fetch { selection, force } => {
            let (s, d, b) = selection.into_parts(force);
            (s, d, b, Mode::Fetch)
        }
        Command::Transform { selection } => {
            let (s, d, b) = selection.into_parts(false);
            (s, d, b, Mode::Transform)
        }
    };

    let mut config = EtlConfig::load()?;
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(base) = base_url {
        config = config.with_base_url(&base);
    }

    let orchestrator = Orchestrator::new(config)?;

    // The run is cancellable: writes are atomic, so an interrupt leaves every
    // partition at its previous successful state.
    let report = tokio::select! {
        report = dispatch(&orchestrator, &selection, command) => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; completed artifacts are intact");
            std::process::exit(130);
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Mode {
    Run,
    Fetch,
    Transform,
}

async fn dispatch(
    orchestrator: &Orchestrator,
    selection: &RunSelection,
    mode: Mode,
) -> Result<RunReport> {
    match mode {
        Mode::Run => orchestrator.run(selection).await,
        Mode::Fetch => orchestrator.fetch_only(selection).await,
        Mode::Transform => orchestrator.transform_only(selection).await,
    }
}
