//! Source fetchers for the regulator endpoints
//!
//! Three fetch strategies, one per regulator publishing style:
//!
//! - **Direct download**: GET a fixed URL, return the body bytes.
//! - **Form-submission download**: load a page, locate a named form, tick
//!   the regulator's mandatory accept-terms checkbox, submit, return the
//!   response bytes.
//! - **Scrape-then-download**: load a page, find the first anchor whose
//!   resolved target matches a URL pattern, then download that target.
//!
//! All strategies are single-attempt; retries and scheduling are the
//! operator's concern. The HTML steps are split out as pure functions
//! ([`find_first_link`], [`parse_form`]) so they can be exercised against
//! static fixtures without a live network.

use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// Request timeout applied to every regulator request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const USER_AGENT: &str = concat!("charity-ingest/", env!("CARGO_PKG_VERSION"));

/// HTTP fetcher shared by all source strategies
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher with the crate's user agent and default timeouts
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// GET a fixed URL and return the body bytes
    ///
    /// Fails with [`Error::Fetch`] on any non-2xx status.
    pub async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(%url, "downloading");
        let response = self.client.get(url.clone()).send().await?;
        let response = check_status(response, url)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Load a page, submit the named form with the accept-terms checkbox
    /// set, and return the response bytes
    ///
    /// The form's pre-populated inputs (hidden viewstate fields and the
    /// like) are carried through the submission, and its `action` is
    /// resolved against the page URL.
    pub async fn download_via_form(
        &self,
        page: &Url,
        form_selector: &str,
        checkbox: &str,
    ) -> Result<Vec<u8>> {
        let html = self.get_text(page).await?;
        let mut form = parse_form(&html, page, form_selector)?;
        form.fields.push((checkbox.to_string(), "on".to_string()));
        info!(%page, action = %form.action, "submitting form");

        let response = self
            .client
            .post(form.action.clone())
            .form(&form.fields)
            .send()
            .await?;
        let response = check_status(response, &form.action)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Scrape a page for the first link matching `pattern`, then download it
    ///
    /// Fails with [`Error::LinkNotFound`] when no anchor on the page
    /// resolves to a matching URL.
    pub async fn discover_and_download(&self, page: &Url, pattern: &Regex) -> Result<Vec<u8>> {
        let html = self.get_text(page).await?;
        let target = find_first_link(&html, page, pattern).ok_or_else(|| Error::LinkNotFound {
            url: page.to_string(),
            pattern: pattern.as_str().to_string(),
        })?;
        info!(%page, %target, "discovered download link");
        self.download(&target).await
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;
        let response = check_status(response, url)?;
        Ok(response.text().await?)
    }
}

fn check_status(response: reqwest::Response, url: &Url) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
        });
    }
    Ok(response)
}

/// A form ready for submission: resolved action URL plus its field values
#[derive(Debug, Clone)]
pub struct FormSubmission {
    /// Absolute URL the form posts to
    pub action: Url,
    /// Name/value pairs the form would submit
    pub fields: Vec<(String, String)>,
}

/// Locate the first anchor in `html` whose href, resolved against `base`,
/// matches `pattern`
///
/// Returns the absolute URL of the match, or `None` when no anchor
/// qualifies. Unresolvable hrefs are skipped.
pub fn find_first_link(html: &str, base: &Url, pattern: &Regex) -> Option<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;
    document.select(&selector).find_map(|anchor| {
        let href = anchor.value().attr("href")?;
        let resolved = base.join(href).ok()?;
        pattern.is_match(resolved.as_str()).then_some(resolved)
    })
}

/// Extract the form matching `form_selector` from `html`
///
/// Collects the submittable input values the browser would send: hidden
/// and text inputs with their `value` attributes, checkboxes and radios
/// only when pre-checked. Buttons are left out. The form `action` is
/// resolved against `base`; a form without an action posts back to the
/// page itself.
pub fn parse_form(html: &str, base: &Url, form_selector: &str) -> Result<FormSubmission> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(form_selector)
        .map_err(|e| Error::Html(format!("invalid form selector `{form_selector}`: {e}")))?;
    let form = document
        .select(&selector)
        .next()
        .ok_or_else(|| Error::FormNotFound {
            url: base.to_string(),
            selector: form_selector.to_string(),
        })?;

    let action = match form.value().attr("action") {
        Some(action) if !action.is_empty() => base.join(action)?,
        _ => base.clone(),
    };

    let input_selector = Selector::parse("input[name]")
        .map_err(|e| Error::Html(format!("selector error: {e}")))?;
    let mut fields = Vec::new();
    for input in form.select(&input_selector) {
        let element = input.value();
        let Some(name) = element.attr("name") else {
            continue;
        };
        let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
        match kind.as_str() {
            "checkbox" | "radio" => {
                if element.attr("checked").is_some() {
                    let value = element.attr("value").unwrap_or("on");
                    fields.push((name.to_string(), value.to_string()));
                }
            }
            "submit" | "button" | "image" | "reset" | "file" => {}
            _ => {
                let value = element.attr("value").unwrap_or("");
                fields.push((name.to_string(), value.to_string()));
            }
        }
    }

    Ok(FormSubmission { action, fields })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base() -> Url {
        Url::parse("http://data.example.gov.uk/downloads").unwrap()
    }

    // -- pure HTML helpers against static fixtures --

    #[test]
    fn finds_first_matching_link_and_resolves_relative_href() {
        let html = r#"
            <html><body>
              <a href="/about">About</a>
              <a href="/data/2024/RegPlusExtract_March.zip">March</a>
              <a href="/data/2024/RegPlusExtract_April.zip">April</a>
            </body></html>
        "#;
        let pattern = Regex::new(r"/data/.*?/RegPlusExtract.*?\.zip").unwrap();
        let url = find_first_link(html, &base(), &pattern).unwrap();
        assert_eq!(
            url.as_str(),
            "http://data.example.gov.uk/data/2024/RegPlusExtract_March.zip"
        );
    }

    #[test]
    fn no_matching_anchor_yields_none() {
        let html = r#"<a href="/about">About</a>"#;
        let pattern = Regex::new(r"\.zip$").unwrap();
        assert!(find_first_link(html, &base(), &pattern).is_none());
    }

    #[test]
    fn unresolvable_hrefs_are_skipped() {
        let html = r#"
            <a href="http://[bad">broken</a>
            <a href="files/register.zip">good</a>
        "#;
        let pattern = Regex::new(r"\.zip$").unwrap();
        let url = find_first_link(html, &base(), &pattern).unwrap();
        assert!(url.as_str().ends_with("files/register.zip"));
    }

    #[test]
    fn parse_form_collects_hidden_inputs_and_resolves_action() {
        let html = r#"
            <form id="siteForm" action="/register/download">
              <input type="hidden" name="__VIEWSTATE" value="abc123" />
              <input type="hidden" name="__EVENTVALIDATION" value="xyz" />
              <input type="checkbox" name="acceptTerms" />
              <input type="submit" name="go" value="Download" />
            </form>
        "#;
        let form = parse_form(html, &base(), "#siteForm").unwrap();
        assert_eq!(
            form.action.as_str(),
            "http://data.example.gov.uk/register/download"
        );
        // unchecked checkbox and the submit button are not submitted
        assert_eq!(
            form.fields,
            vec![
                ("__VIEWSTATE".to_string(), "abc123".to_string()),
                ("__EVENTVALIDATION".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn parse_form_keeps_prechecked_checkboxes() {
        let html = r#"
            <form id="f">
              <input type="checkbox" name="remember" checked value="yes" />
            </form>
        "#;
        let form = parse_form(html, &base(), "#f").unwrap();
        assert_eq!(form.fields, vec![("remember".to_string(), "yes".to_string())]);
        // no action attribute: posts back to the page
        assert_eq!(form.action, base());
    }

    #[test]
    fn missing_form_is_form_not_found() {
        let err = parse_form("<html></html>", &base(), "#uxSiteForm").unwrap_err();
        assert!(matches!(err, Error::FormNotFound { selector, .. } if selector == "#uxSiteForm"));
    }

    // -- fetch strategies against a mock server --

    #[tokio::test]
    async fn direct_download_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/register.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"name,number\n".to_vec()))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = Url::parse(&format!("{}/register.csv", server.uri())).unwrap();
        let body = fetcher.download(&url).await.unwrap();
        assert_eq!(body, b"name,number\n");
    }

    #[tokio::test]
    async fn direct_download_surfaces_non_2xx_as_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/register.csv"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let url = Url::parse(&format!("{}/register.csv", server.uri())).unwrap();
        let err = fetcher.download(&url).await.unwrap_err();
        match err {
            Error::Fetch { status, .. } => assert_eq!(status, 500),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn form_submission_posts_hidden_fields_and_checkbox() {
        let server = MockServer::start().await;
        let page_html = r#"
            <form id="uxSiteForm" action="/download" method="post">
              <input type="hidden" name="__VIEWSTATE" value="vs" />
              <input type="checkbox" name="cbTermsConditions" />
            </form>
        "#;
        Mock::given(method("GET"))
            .and(path("/register-download"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_html))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zipbytes".to_vec()))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let page = Url::parse(&format!("{}/register-download", server.uri())).unwrap();
        let body = fetcher
            .download_via_form(&page, "#uxSiteForm", "cbTermsConditions")
            .await
            .unwrap();
        assert_eq!(body, b"PK\x03\x04zipbytes");

        let requests = server.received_requests().await.unwrap();
        let post = requests
            .iter()
            .find(|r| r.method.to_string() == "POST")
            .unwrap();
        let form_body = String::from_utf8(post.body.clone()).unwrap();
        assert!(form_body.contains("__VIEWSTATE=vs"));
        assert!(form_body.contains("cbTermsConditions=on"));
    }

    #[tokio::test]
    async fn form_submission_500_carries_status_in_error() {
        let server = MockServer::start().await;
        let page_html = r#"<form id="f" action="/download"></form>"#;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_html))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let page = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let err = fetcher
            .download_via_form(&page, "#f", "accept")
            .await
            .unwrap_err();
        match err {
            Error::Fetch { status, reason, .. } => {
                assert_eq!(status, 500);
                assert_eq!(reason, "Internal Server Error");
            }
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scrape_then_download_follows_discovered_link() {
        let server = MockServer::start().await;
        let page_html = r#"
            <a href="/about">About</a>
            <a href="/data/extract/RegPlusExtract_2024.zip">Download</a>
        "#;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_html))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/extract/RegPlusExtract_2024.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zipdata".to_vec()))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let page = Url::parse(&server.uri()).unwrap();
        let pattern = Regex::new(r"/data/.*?/RegPlusExtract.*?\.zip").unwrap();
        let body = fetcher.discover_and_download(&page, &pattern).await.unwrap();
        assert_eq!(body, b"zipdata");
    }

    #[tokio::test]
    async fn scrape_without_matching_link_is_link_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<a href="/about">About</a>"#),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new().unwrap();
        let page = Url::parse(&server.uri()).unwrap();
        let pattern = Regex::new(r"RegPlusExtract.*?\.zip").unwrap();
        let err = fetcher
            .discover_and_download(&page, &pattern)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LinkNotFound { .. }));
    }
}
