//! # charity-ingest
//!
//! Acquires the charity-register datasets published by the three UK
//! regulators — England & Wales, Scotland, and Northern Ireland — and
//! normalizes them into a uniform CSV corpus on disk, plus provisions the
//! search-index schema the corpus is loaded into.
//!
//! The regulators publish in heterogeneous formats: plain CSV over HTTP,
//! CSV behind an accept-terms form submission, and a ZIP of legacy BCP
//! bulk extracts discovered by scraping a data page. The [`pipeline`]
//! module sequences one fetch–extract–decode–persist pass per source; the
//! [`bcp`] module holds the byte-level decoder that turns a bulk extract
//! into rows.
//!
//! ## Quick start
//!
//! ```no_run
//! use charity_ingest::{config::FetchConfig, pipeline::Pipeline, sources};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetchConfig::default();
//!     let registry = sources::registry(&config)?;
//!     let pipeline = Pipeline::new(&config.folder)?;
//!     let summary = pipeline.run(&registry).await?;
//!     for name in summary.failed_sources() {
//!         eprintln!("source failed: {name}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// ZIP payload extraction
pub mod archive;
/// Legacy BCP bulk-export decoder
pub mod bcp;
/// Run configuration and regulator endpoints
pub mod config;
/// Error types
pub mod error;
/// Source fetchers (direct, form submission, scrape-then-download)
pub mod fetch;
/// Search-index schema provisioning
pub mod index;
/// Pipeline orchestrator
pub mod pipeline;
/// Source descriptors and the built-in registry
pub mod sources;

// Re-export commonly used types
pub use archive::ArchiveEntry;
pub use config::{FetchConfig, IndexConfig};
pub use error::{Error, Result};
pub use fetch::Fetcher;
pub use index::{IndexDefinition, IndexStore};
pub use pipeline::{Outcome, Pipeline, RunSummary};
pub use sources::{FetchStrategy, OutputKind, SourceDescriptor};
