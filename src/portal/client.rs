//! Cookie-bearing HTTP session against the distributor portal.

use crate::config::{Config, Credentials};
use crate::portal::error::PortalError;
use crate::portal::parser::LISTING_PATH;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use wreq::{Client, Response};
use wreq_util::Emulation;

/// AJAX endpoint handling sign-in.
const SIGN_IN_PATH: &str = "generalActions.cfm";

/// Per-manufacturer PDF price sheet.
const PRICE_SHEET_PATH: &str = "priceSheetPDF.cfm";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const AJAX_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// An HTML page and the URL it was served from after redirects.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub html: String,
}

/// Portal operations used by the collect command - enables mocking for tests.
#[async_trait]
pub trait PortalSession: Send {
    /// Submits the stored credentials.
    async fn login(&mut self) -> Result<(), PortalError>;

    /// Fetches the first listing page for a manufacturer.
    async fn fetch_manufacturer_page(&mut self, manufacturer: &str) -> Result<FetchedPage, PortalError>;

    /// Fetches an absolute portal URL (used for follow-up listing pages).
    async fn fetch_page(&mut self, url: &Url) -> Result<FetchedPage, PortalError>;

    /// Downloads the PDF price sheet for a manufacturer.
    async fn download_price_sheet(&mut self, manufacturer: &str) -> Result<Vec<u8>, PortalError>;
}

/// Sign-in endpoint reply. ColdFusion upper-cases the keys.
#[derive(Debug, Deserialize)]
struct SignInReply {
    #[serde(rename = "SUCCESSMESSAGE", default)]
    success_message: Option<String>,
    #[serde(rename = "ERRORMESSAGE", default)]
    error_message: Option<String>,
}

/// Portal HTTP client with a cookie store and browser emulation.
pub struct PortalClient {
    client: Client,
    credentials: Option<Credentials>,
    base_url: Url,
    user_agent: String,
    delay_ms: u64,
    delay_jitter_ms: u64,
    primed: bool,
    requests_sent: u64,
}

impl PortalClient {
    /// Creates a new client. `credentials` may be None for anonymous runs.
    pub fn new(config: &Config, credentials: Option<Credentials>) -> Result<Self> {
        let base = config.normalized_base_url();
        let base_url = Url::parse(&base).with_context(|| format!("Invalid base URL: {}", base))?;

        let timeout = Duration::from_secs(config.timeout_secs.max(1));

        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(wreq::redirect::Policy::limited(10))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            credentials,
            base_url,
            user_agent: config.effective_user_agent().to_string(),
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
            primed: false,
            requests_sent: 0,
        })
    }

    /// Visits the home page once to pick up gateway cookies.
    ///
    /// When the portal redirects, the session moves to the root of the final
    /// host. Otherwise the configured base URL, path included, is kept.
    async fn prime(&mut self) -> Result<(), PortalError> {
        if self.primed {
            return Ok(());
        }

        let url = self.base_url.clone();
        debug!("Priming session at {}", url);
        let response = self.get(&url).await?;

        let final_url = served_url(&response, &url);
        if final_url != url {
            let mut canonical = final_url;
            canonical.set_path("/");
            canonical.set_query(None);
            canonical.set_fragment(None);
            info!("Portal redirected to {}, using it as base URL", canonical);
            self.base_url = canonical;
        }

        self.primed = true;
        Ok(())
    }

    /// Resolves a portal path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, PortalError> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::RequestFailed(format!("Invalid URL for {}: {}", path, e)))
    }

    /// Performs a GET with browser headers and checks the status.
    async fn get(&mut self, url: &Url) -> Result<Response, PortalError> {
        self.pace().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .emulation(Emulation::Chrome131)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", HTML_ACCEPT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", self.base_url.as_str())
            .send()
            .await
            .map_err(|e| transport_error("GET", url, &e))?;

        check_status(response, url)
    }

    /// Performs a form-encoded AJAX POST.
    async fn post_form(&mut self, url: &Url, fields: &[(&str, &str)]) -> Result<Response, PortalError> {
        self.pace().await;

        debug!("POST {}", url);

        let response = self
            .client
            .post(url.as_str())
            .emulation(Emulation::Chrome131)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", AJAX_ACCEPT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Content-Type", FORM_CONTENT_TYPE)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Origin", self.base_url.origin().ascii_serialization())
            .header("Referer", self.base_url.as_str())
            .body(form_body(fields))
            .send()
            .await
            .map_err(|e| transport_error("POST", url, &e))?;

        check_status(response, url)
    }

    /// Sleeps between requests. The first request goes out immediately.
    async fn pace(&mut self) {
        let first = self.requests_sent == 0;
        self.requests_sent += 1;

        if first || self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl PortalSession for PortalClient {
    async fn login(&mut self) -> Result<(), PortalError> {
        let credentials = self.credentials.clone().ok_or_else(|| {
            PortalError::Authentication("Email and password are required to log in.".to_string())
        })?;

        self.prime().await?;

        let url = self.endpoint(SIGN_IN_PATH)?;
        info!("Signing in as {}", credentials.email);

        let response = self
            .post_form(
                &url,
                &[
                    ("Action", "SignIn"),
                    ("email", credentials.email.as_str()),
                    ("passwd", credentials.password.as_str()),
                ],
            )
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| transport_error("POST", &url, &e))?;

        let reply: SignInReply = serde_json::from_str(&body).map_err(|e| {
            debug!("Unexpected sign-in body: {:.200}", body);
            PortalError::RequestFailed(format!("Login response did not contain valid JSON: {}", e))
        })?;

        if let Some(message) = reply.error_message.filter(|m| !m.trim().is_empty()) {
            return Err(PortalError::Authentication(message.trim().to_string()));
        }

        if !reply.success_message.is_some_and(|m| !m.trim().is_empty()) {
            return Err(PortalError::Authentication(
                "Login failed without a specific error message.".to_string(),
            ));
        }

        info!("Signed in");
        Ok(())
    }

    async fn fetch_manufacturer_page(&mut self, manufacturer: &str) -> Result<FetchedPage, PortalError> {
        self.prime().await?;

        let mut url = self.endpoint(LISTING_PATH)?;
        url.query_pairs_mut()
            .append_pair("pagelink", "manufacturer")
            .append_pair("pagelink1", manufacturer)
            .append_pair("logo", "Y");

        info!("Fetching listing: {}", manufacturer);
        self.fetch_page(&url).await
    }

    async fn fetch_page(&mut self, url: &Url) -> Result<FetchedPage, PortalError> {
        self.prime().await?;

        let response = self.get(url).await?;
        let served = served_url(&response, url);
        let html = response.text().await.map_err(|e| transport_error("GET", url, &e))?;

        Ok(FetchedPage { url: served, html })
    }

    async fn download_price_sheet(&mut self, manufacturer: &str) -> Result<Vec<u8>, PortalError> {
        self.prime().await?;

        let mut url = self.endpoint(PRICE_SHEET_PATH)?;
        url.query_pairs_mut().append_pair("manufacturer", manufacturer);

        info!("Downloading price sheet: {}", manufacturer);
        let response = self.get(&url).await?;
        let bytes = response.bytes().await.map_err(|e| transport_error("GET", &url, &e))?;

        Ok(bytes.to_vec())
    }
}

/// URL the response was finally served from, or `requested` if it cannot be parsed.
fn served_url(response: &Response, requested: &Url) -> Url {
    Url::parse(&response.uri().to_string()).unwrap_or_else(|_| requested.clone())
}

/// Encodes `application/x-www-form-urlencoded` fields.
fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Maps a non-success status to a request failure.
fn check_status(response: Response, url: &Url) -> Result<Response, PortalError> {
    let status = response.status();
    debug!("Response status: {}", status);

    if !status.is_success() {
        if status.as_u16() == 403 {
            warn!("Portal refused the request (403). The gateway may be blocking this client.");
        }
        return Err(PortalError::RequestFailed(format!("{} returned status {}", url, status)));
    }

    Ok(response)
}

/// Builds a request failure and logs the full error chain at debug level.
fn transport_error(method: &str, url: &Url, err: &wreq::Error) -> PortalError {
    let mut detail = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }

    debug!("{} {} failed: {}", method, url, detail);
    PortalError::RequestFailed(format!("{} {}: {}", method, url, err))
}
