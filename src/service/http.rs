//! Page fetching over HTTP.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::domain::models::ResponseHeaders;
use crate::error::{AppError, Result};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:136.0) Gecko/20100101 Firefox/136.0";
const SERVICE_USER_AGENT: &str = concat!("seo-auditor/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub enum ClientType {
    /// Identifies itself as the auditor. Used for API calls.
    Standard,
    /// Sends desktop browser headers so pages serve their normal markup.
    Browser,
}

/// Factory for creating an HTTP client for the given caller.
pub fn create_client(client_type: ClientType) -> anyhow::Result<Client> {
    let builder = Client::builder()
        .timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

    match client_type {
        ClientType::Browser => {
            let mut headers = HeaderMap::new();
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            );
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
            builder
                .user_agent(BROWSER_USER_AGENT)
                .default_headers(headers)
                .build()
                .context("Failed to build browser HTTP client")
        }
        ClientType::Standard => builder
            .user_agent(SERVICE_USER_AGENT)
            .build()
            .context("Failed to build standard HTTP client"),
    }
}

/// One successfully fetched document.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: ResponseHeaders,
    pub body: String,
}

/// Retrieves a document. Any non-2xx status, network error or timeout is a
/// `FetchFailure` naming the requested URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client_type: ClientType) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client(client_type)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        let parsed = Url::parse(url).map_err(|e| AppError::fetch(url, format!("invalid URL: {}", e)))?;

        log::debug!("[FETCH] GET {} (timeout {:?})", parsed, timeout);
        let response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, describe(&e, timeout)))?;

        let status = response.status();
        if !status.is_success() {
            log::debug!("[FETCH] {} returned {}", url, status);
            return Err(AppError::fetch(url, format!("HTTP status {}", status.as_u16())));
        }

        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| AppError::fetch(url, describe(&e, timeout)))?;

        log::debug!("[FETCH] {} -> {} ({} bytes)", url, status.as_u16(), body.len());
        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

fn describe(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("timed out after {}s", timeout.as_secs())
    } else {
        err.to_string()
    }
}

/// Header names are already lowercase in `HeaderMap`; repeated headers are
/// joined with ", ".
fn collect_headers(map: &HeaderMap) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}
