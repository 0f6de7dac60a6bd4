use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::required;
use crate::error::Result;
use crate::extractor::sitemap::discover_sitemap_urls;
use crate::lifecycle::AppState;

const DEFAULT_MAX_URLS: usize = 500;
const MAX_URLS_LIMIT: usize = 5000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoverRequest {
    pub site_url: String,
    pub max_urls: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub site_url: String,
    pub urls: Vec<String>,
}

#[post("/discover")]
pub async fn discover(state: web::Data<AppState>, body: web::Json<DiscoverRequest>) -> Result<HttpResponse> {
    let site_url = required(&body.site_url, "siteUrl")?;
    let max_urls = body.max_urls.unwrap_or(DEFAULT_MAX_URLS).clamp(1, MAX_URLS_LIMIT);

    let urls = discover_sitemap_urls(state.fetcher.as_ref(), site_url, max_urls, state.settings.fetch_timeout).await?;
    Ok(HttpResponse::Ok().json(DiscoverResponse {
        site_url: site_url.to_string(),
        urls,
    }))
}
