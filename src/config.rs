//! Run configuration for charity-ingest
//!
//! Immutable values constructed once per run from CLI arguments (and, for
//! the index store, the environment). Defaults are the regulator endpoints
//! the original data pipeline pointed at.

use std::path::PathBuf;

use url::Url;

use crate::error::Result;

/// Dual-registered charities CSV (direct download)
pub const DUAL_URL: &str =
    "https://github.com/drkane/charity-lookups/blob/master/dual-registered-uk-charities.csv";

/// OSCR charity-register download page (form submission)
pub const OSCR_URL: &str =
    "https://www.oscr.org.uk/about-charities/search-the-register/charity-register-download";

/// Charity Commission for England & Wales data page (scrape-then-download)
pub const CCEW_URL: &str = "http://data.charitycommission.gov.uk/";

/// Charity Commission for Northern Ireland register CSV (direct download)
pub const CCNI_URL: &str = "http://www.charitycommissionni.org.uk/charity-search/?q=&include=Linked&include=Removed&exportCSV=1";

/// Additional names for NI charities (direct download)
pub const CCNI_EXTRA_URL: &str = "https://gist.githubusercontent.com/BobHarper1/2687545c562b47bc755aef2e9e0de537/raw/ac052c33fd14a08dd4c2a0604b54c50bc1ecc0db/ccni_extra";

/// Pattern the CCEW data page's bulk-download link must match
pub const CCEW_LINK_PATTERN: &str =
    r"http://apps\.charitycommission\.gov\.uk/data/.*?/RegPlusExtract.*?\.zip";

/// CSS selector for the OSCR download form
pub const OSCR_FORM_SELECTOR: &str = "#uxSiteForm";

/// Name of the OSCR terms-and-conditions checkbox the regulator requires
pub const OSCR_TERMS_CHECKBOX: &str = "ctl00$ctl00$ctl00$ContentPlaceHolderDefault$WebsiteContent$ctl05$CharityRegDownload_10$cbTermsConditions";

/// Environment variables that, if set, override the index store's
/// connection target entirely (checked in order, first set wins)
pub const INDEX_URL_ENV_VARS: &[&str] = &["ELASTICSEARCH_URL", "ES_URL", "BONSAI_URL"];

/// Configuration for one fetch run
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Root path of the output data folder
    pub folder: PathBuf,
    /// URL of the dual-registered charities CSV
    pub dual_url: String,
    /// URL of the OSCR download page
    pub oscr_url: String,
    /// URL of the CCEW data page
    pub ccew_url: String,
    /// URL of the CCNI register CSV
    pub ccni_url: String,
    /// URL of the CCNI extra-names CSV
    pub ccni_extra_url: String,
    /// Skip the Scottish regulator
    pub skip_oscr: bool,
    /// Skip the England & Wales regulator
    pub skip_ccew: bool,
    /// Skip the Northern Ireland regulator (and its extra-names CSV)
    pub skip_ccni: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("data"),
            dual_url: DUAL_URL.to_string(),
            oscr_url: OSCR_URL.to_string(),
            ccew_url: CCEW_URL.to_string(),
            ccni_url: CCNI_URL.to_string(),
            ccni_extra_url: CCNI_EXTRA_URL.to_string(),
            skip_oscr: false,
            skip_ccew: false,
            skip_ccni: false,
        }
    }
}

/// Connection and lifecycle settings for the search-index store
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Host of the index store
    pub host: String,
    /// Port of the index store
    pub port: u16,
    /// URL prefix, for stores mounted under a subpath
    pub url_prefix: String,
    /// Connect over https
    pub use_ssl: bool,
    /// Name of the index holding charity data
    pub index: String,
    /// Delete and recreate the index if it already exists
    pub reset: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            url_prefix: String::new(),
            use_ssl: false,
            index: "charitysearch".to_string(),
            reset: false,
        }
    }
}

impl IndexConfig {
    /// Resolve the store's base URL, honoring the environment overrides
    ///
    /// The first set variable in [`INDEX_URL_ENV_VARS`] replaces the
    /// host/port/prefix settings wholesale.
    pub fn base_url(&self) -> Result<Url> {
        self.base_url_from(|name| std::env::var(name).ok())
    }

    /// Like [`IndexConfig::base_url`] with an explicit variable lookup,
    /// so override precedence is testable without touching process state
    pub fn base_url_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Url> {
        for name in INDEX_URL_ENV_VARS {
            if let Some(value) = lookup(name) {
                if !value.is_empty() {
                    return Ok(Url::parse(&value)?);
                }
            }
        }
        let scheme = if self.use_ssl { "https" } else { "http" };
        let prefix = self.url_prefix.trim_matches('/');
        let base = if prefix.is_empty() {
            format!("{scheme}://{}:{}/", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}/{prefix}/", self.host, self.port)
        };
        Ok(Url::parse(&base)?)
    }
}
