//! Pipeline orchestrator
//!
//! Runs each enabled source independently: fetch, then extract and decode
//! as the source requires, then persist CSV under the data folder. A
//! failure in one source is logged with its context and the run moves on
//! to the next; the summary records every outcome so the caller can
//! decide the exit status.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::archive;
use crate::bcp;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::sources::{FetchStrategy, OutputKind, SourceDescriptor};

/// How one source's run ended
#[derive(Debug)]
pub enum Outcome {
    /// Output written
    Succeeded,
    /// Source was disabled by its skip flag
    Skipped,
    /// The source's pipeline failed; no output (or partial output) remains
    Failed {
        /// The error that ended the source's run
        error: Error,
    },
}

/// Per-source outcomes of one pipeline run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// (source name, outcome) pairs in processing order
    pub outcomes: Vec<(&'static str, Outcome)>,
}

impl RunSummary {
    /// Names of sources that failed
    pub fn failed_sources(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| matches!(outcome, Outcome::Failed { .. }).then_some(*name))
            .collect()
    }

    /// Whether every enabled source produced its output
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed_sources().is_empty()
    }
}

/// Sequences fetch → extract → decode → persist for each source
pub struct Pipeline {
    fetcher: Fetcher,
    folder: PathBuf,
}

impl Pipeline {
    /// Create a pipeline writing into `folder`
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new()?,
            folder: folder.into(),
        })
    }

    /// Run every descriptor in order, one at a time
    ///
    /// Only failure to create the data folder aborts the whole run; source
    /// failures are recorded in the summary and processing continues.
    pub async fn run(&self, sources: &[SourceDescriptor]) -> Result<RunSummary> {
        fs::create_dir_all(&self.folder)?;

        let mut summary = RunSummary::default();
        for source in sources {
            if source.skip {
                info!(source = source.name, "source skipped");
                summary.outcomes.push((source.name, Outcome::Skipped));
                continue;
            }
            match self.run_source(source).await {
                Ok(()) => {
                    info!(source = source.name, "source complete");
                    summary.outcomes.push((source.name, Outcome::Succeeded));
                }
                Err(e) => {
                    error!(
                        source = source.name,
                        fatal = e.is_fatal(),
                        error = %e,
                        "source failed"
                    );
                    summary
                        .outcomes
                        .push((source.name, Outcome::Failed { error: e }));
                }
            }
        }
        Ok(summary)
    }

    async fn run_source(&self, source: &SourceDescriptor) -> Result<()> {
        let body = match &source.strategy {
            FetchStrategy::Direct { url } => {
                info!(source = source.name, %url, "downloading");
                self.fetcher.download(url).await?
            }
            FetchStrategy::Form {
                url,
                form_selector,
                checkbox,
            } => {
                info!(source = source.name, %url, "downloading via form submission");
                self.fetcher
                    .download_via_form(url, form_selector, checkbox)
                    .await?
            }
            FetchStrategy::Scrape { page, link_pattern } => {
                info!(source = source.name, %page, "scraping for download link");
                self.fetcher.discover_and_download(page, link_pattern).await?
            }
        };

        match &source.output {
            OutputKind::Csv { filename } => self.write_raw(source.name, filename, &body),
            OutputKind::SingleCsvZip { filename } => {
                let entry = archive::extract_single(&body)?;
                self.write_raw(source.name, filename, &entry.data)
            }
            OutputKind::BcpZip { subfolder } => {
                let dir = self.folder.join(subfolder);
                fs::create_dir_all(&dir)?;
                let entries = archive::extract(&body)?;
                if entries.is_empty() {
                    warn!(source = source.name, "archive contained no file entries");
                }
                for entry in entries {
                    let path = dir.join(&entry.name);
                    write_decoded_csv(&path, &entry.data)?;
                    info!(source = source.name, file = %entry.name, "decoded extract written");
                }
                Ok(())
            }
        }
    }

    fn write_raw(&self, source: &str, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = self.folder.join(filename);
        fs::write(&path, bytes)?;
        info!(source, path = %path.display(), bytes = bytes.len(), "written");
        Ok(())
    }
}

/// Decode one bulk extract and serialize it as CSV at `path`
///
/// Rows stream straight from the decoder into the writer, so memory stays
/// proportional to one row. Fields are re-encoded to ISO-8859-1 on the way
/// out, preserving the corpus encoding byte for byte. A decode error
/// removes the partial file before propagating; truncated input must not
/// masquerade as a valid (short) CSV.
fn write_decoded_csv(path: &Path, payload: &[u8]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in bcp::decode(payload) {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(path);
                return Err(e);
            }
        };
        writer.write_record(row.iter().map(|field| latin1_bytes(field)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Narrow a decoded field back to ISO-8859-1 bytes
///
/// Decoded fields only contain code points below U+0100, the image of the
/// Latin-1 decode; anything else would be a logic error and is replaced
/// with `?` rather than corrupting the output width.
fn latin1_bytes(field: &str) -> Vec<u8> {
    field
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
