//! Search-index schema provisioning
//!
//! Independent of the fetch pipeline: talks to the Elasticsearch HTTP API
//! to create (or delete-and-recreate) the charity index and apply its
//! field mapping. Provisioning is idempotent — creating an existing index
//! is a no-op and the mapping is reapplied on every call.

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// Declarative index definition: name plus its field-mapping document
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    /// Index name
    pub name: String,
    /// Mapping document applied to the index
    pub mapping: Value,
}

/// The charity-search index definition
///
/// The mapping declares a `complete_names` completion-suggester field with
/// a categorical filtering context keyed by the `organisationType` field,
/// so autocomplete can be narrowed to one organisation type.
pub fn charity_search_index(name: impl Into<String>) -> IndexDefinition {
    IndexDefinition {
        name: name.into(),
        mapping: json!({
            "properties": {
                "complete_names": {
                    "type": "completion",
                    "contexts": [
                        {
                            "name": "place_type",
                            "type": "category",
                            "path": "organisationType"
                        }
                    ]
                }
            }
        }),
    }
}

/// Thin client for the index store's HTTP API
pub struct IndexStore {
    client: reqwest::Client,
    base: Url,
}

impl IndexStore {
    /// Create a store client against `base` (scheme, host, port, prefix)
    pub fn new(mut base: Url) -> Result<Self> {
        // Url::join treats a base without a trailing slash as a file and
        // replaces its last path segment, which would lose the prefix of
        // an override URL like https://host/prefix
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base,
        })
    }

    /// Create or recreate the index and apply its mapping
    ///
    /// With `reset` set, an existing index is deleted first. Without it,
    /// an existing index is left in place; either way the mapping is
    /// (re)applied before returning.
    pub async fn provision(&self, definition: &IndexDefinition, reset: bool) -> Result<()> {
        if reset && self.exists(&definition.name).await? {
            info!(index = %definition.name, "deleting existing index");
            self.delete(&definition.name).await?;
        }
        if self.exists(&definition.name).await? {
            debug!(index = %definition.name, "index already present");
        } else {
            info!(index = %definition.name, "creating index");
            self.create(&definition.name).await?;
        }
        self.put_mapping(&definition.name, &definition.mapping)
            .await?;
        info!(index = %definition.name, "mapping applied");
        Ok(())
    }

    /// Whether the named index exists
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let url = self.index_url(name)?;
        let response = self.client.head(url.clone()).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::Index(format!(
                "HEAD {url} returned HTTP {status}"
            ))),
        }
    }

    /// Create the named index
    pub async fn create(&self, name: &str) -> Result<()> {
        let url = self.index_url(name)?;
        let response = self.client.put(url.clone()).send().await?;
        check_ok("PUT", &url, response).await
    }

    /// Delete the named index
    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.index_url(name)?;
        let response = self.client.delete(url.clone()).send().await?;
        check_ok("DELETE", &url, response).await
    }

    /// Apply `mapping` to the named index
    pub async fn put_mapping(&self, name: &str, mapping: &Value) -> Result<()> {
        let url = self.index_url(&format!("{name}/_mapping"))?;
        let response = self.client.put(url.clone()).json(mapping).send().await?;
        check_ok("PUT", &url, response).await
    }

    fn index_url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

async fn check_ok(verb: &str, url: &Url, response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Index(format!(
        "{verb} {url} returned HTTP {status}: {body}"
    )))
}
