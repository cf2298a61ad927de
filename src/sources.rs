//! Source descriptors for the regulator datasets
//!
//! A [`SourceDescriptor`] pairs a fetch strategy with what to do with the
//! downloaded bytes. Descriptors are built once per run from the
//! [`FetchConfig`](crate::config::FetchConfig) and never mutated.

use regex::Regex;
use url::Url;

use crate::config::{self, FetchConfig};
use crate::error::Result;

/// How a source's bytes are obtained
#[derive(Debug, Clone)]
pub enum FetchStrategy {
    /// HTTP GET of a fixed URL
    Direct {
        /// The download URL
        url: Url,
    },
    /// Load a page, tick the accept-terms checkbox on a named form, submit
    Form {
        /// The page holding the form
        url: Url,
        /// CSS selector naming the form
        form_selector: String,
        /// Name of the checkbox the regulator requires to be set
        checkbox: String,
    },
    /// Load a page and download the first link matching a URL pattern
    Scrape {
        /// The page to scrape
        page: Url,
        /// Pattern the resolved link target must match
        link_pattern: Regex,
    },
}

/// What the downloaded bytes are and how to persist them
#[derive(Debug, Clone)]
pub enum OutputKind {
    /// Body is already CSV; write it as-is under this filename
    Csv {
        /// Output filename within the data folder
        filename: String,
    },
    /// Body is a ZIP asserted to hold exactly one CSV; unwrap and write
    SingleCsvZip {
        /// Output filename within the data folder
        filename: String,
    },
    /// Body is a ZIP of legacy bulk extracts; decode each entry to CSV
    /// under this subfolder, named after the entry
    BcpZip {
        /// Subfolder of the data folder receiving the decoded CSVs
        subfolder: String,
    },
}

/// One regulator dataset: name, fetch strategy, output, skip flag
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Short name used in logs and the run summary
    pub name: &'static str,
    /// How to obtain the bytes
    pub strategy: FetchStrategy,
    /// How to persist them
    pub output: OutputKind,
    /// Leave this source out of the run
    pub skip: bool,
}

/// Build the run's source registry from configuration
///
/// Order matches the original pipeline: dual-register CSV first, then
/// OSCR, CCEW, and the two Northern Ireland downloads. The extra-names
/// CSV shares CCNI's skip flag.
pub fn registry(config: &FetchConfig) -> Result<Vec<SourceDescriptor>> {
    let ccew_pattern = Regex::new(config::CCEW_LINK_PATTERN)
        .map_err(|e| crate::error::Error::Html(format!("invalid link pattern: {e}")))?;

    Ok(vec![
        SourceDescriptor {
            name: "dual",
            strategy: FetchStrategy::Direct {
                url: Url::parse(&config.dual_url)?,
            },
            output: OutputKind::Csv {
                filename: "dual-registered-uk-charities.csv".to_string(),
            },
            skip: false,
        },
        SourceDescriptor {
            name: "oscr",
            strategy: FetchStrategy::Form {
                url: Url::parse(&config.oscr_url)?,
                form_selector: config::OSCR_FORM_SELECTOR.to_string(),
                checkbox: config::OSCR_TERMS_CHECKBOX.to_string(),
            },
            output: OutputKind::SingleCsvZip {
                filename: "oscr.csv".to_string(),
            },
            skip: config.skip_oscr,
        },
        SourceDescriptor {
            name: "ccew",
            strategy: FetchStrategy::Scrape {
                page: Url::parse(&config.ccew_url)?,
                link_pattern: ccew_pattern,
            },
            output: OutputKind::BcpZip {
                subfolder: "ccew".to_string(),
            },
            skip: config.skip_ccew,
        },
        SourceDescriptor {
            name: "ccni_extra",
            strategy: FetchStrategy::Direct {
                url: Url::parse(&config.ccni_extra_url)?,
            },
            output: OutputKind::Csv {
                filename: "ccni_extra_names.csv".to_string(),
            },
            skip: config.skip_ccni,
        },
        SourceDescriptor {
            name: "ccni",
            strategy: FetchStrategy::Direct {
                url: Url::parse(&config.ccni_url)?,
            },
            output: OutputKind::Csv {
                filename: "ccni.csv".to_string(),
            },
            skip: config.skip_ccni,
        },
    ])
}
