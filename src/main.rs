//! charity-ingest CLI
//!
//! Two entry points: `fetch` runs the acquisition pipeline over the
//! regulator sources, `init-index` provisions the search-index schema.
//! Exit code is non-zero when any enabled source fails or provisioning
//! errors out.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use charity_ingest::config::{self, FetchConfig, IndexConfig};
use charity_ingest::index::{self, IndexStore};
use charity_ingest::pipeline::Pipeline;
use charity_ingest::sources;

#[derive(Parser)]
#[command(name = "charity-ingest")]
#[command(about = "Fetch UK charity-register data and provision its search index")]
#[command(version)]
struct Cli {
    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the regulator datasets and normalize them to CSV
    Fetch {
        /// CSV with dual-registered charities
        #[arg(long, default_value = config::DUAL_URL)]
        dual: String,

        /// URL of the page containing Scottish charity data
        #[arg(long, default_value = config::OSCR_URL)]
        oscr: String,

        /// URL of the page containing Charity Commission data
        #[arg(long, default_value = config::CCEW_URL)]
        ccew: String,

        /// CSV of Northern Ireland Charity Commission data
        #[arg(long, default_value = config::CCNI_URL)]
        ccni: String,

        /// CSV of NI charities with other names
        #[arg(long, default_value = config::CCNI_EXTRA_URL)]
        ccni_extra: String,

        /// Don't fetch data from the Office of the Scottish Charity Regulator
        #[arg(long)]
        skip_oscr: bool,

        /// Don't fetch data from the Charity Commission for England and Wales
        #[arg(long)]
        skip_ccew: bool,

        /// Don't fetch data from the Charity Commission for Northern Ireland
        #[arg(long)]
        skip_ccni: bool,

        /// Root path of the data folder
        #[arg(long, default_value = "data")]
        folder: PathBuf,
    },
    /// Create the search index and apply its field mapping
    InitIndex {
        /// Delete and recreate the index if it already exists
        #[arg(long)]
        reset: bool,

        /// Host of the elasticsearch instance
        #[arg(long, default_value = "localhost")]
        es_host: String,

        /// Port of the elasticsearch instance
        #[arg(long, default_value_t = 9200)]
        es_port: u16,

        /// Elasticsearch URL prefix
        #[arg(long, default_value = "")]
        es_url_prefix: String,

        /// Use ssl to connect to elasticsearch
        #[arg(long)]
        es_use_ssl: bool,

        /// Index used to store charity data
        #[arg(long, default_value = "charitysearch")]
        es_index: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: failed to install tracing subscriber");
    }

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> charity_ingest::Result<ExitCode> {
    match command {
        Commands::Fetch {
            dual,
            oscr,
            ccew,
            ccni,
            ccni_extra,
            skip_oscr,
            skip_ccew,
            skip_ccni,
            folder,
        } => {
            let config = FetchConfig {
                folder,
                dual_url: dual,
                oscr_url: oscr,
                ccew_url: ccew,
                ccni_url: ccni,
                ccni_extra_url: ccni_extra,
                skip_oscr,
                skip_ccew,
                skip_ccni,
            };
            let registry = sources::registry(&config)?;
            let pipeline = Pipeline::new(&config.folder)?;
            let summary = pipeline.run(&registry).await?;
            if summary.all_succeeded() {
                Ok(ExitCode::SUCCESS)
            } else {
                error!(failed = ?summary.failed_sources(), "run finished with failures");
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::InitIndex {
            reset,
            es_host,
            es_port,
            es_url_prefix,
            es_use_ssl,
            es_index,
        } => {
            let config = IndexConfig {
                host: es_host,
                port: es_port,
                url_prefix: es_url_prefix,
                use_ssl: es_use_ssl,
                index: es_index,
                reset,
            };
            let store = IndexStore::new(config.base_url()?)?;
            let definition = index::charity_search_index(&config.index);
            store.provision(&definition, config.reset).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
