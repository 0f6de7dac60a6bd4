use quick_xml::events::Event;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::{AppError, Result};
use crate::service::http::PageFetcher;

/// Tried in order after any `Sitemap:` lines found in robots.txt.
pub const SITEMAP_CANDIDATES: &[&str] = &[
    "sitemap.xml",
    "sitemap_index.xml",
    "wp-sitemap.xml",
    "sitemap-index.xml",
];

/// How many levels of `<sitemapindex>` nesting are followed.
pub const MAX_SITEMAP_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapFormat {
    Xml,
    PlainText,
}

impl SitemapFormat {
    pub fn detect(text: &str) -> Self {
        match text.contains("<loc>") {
            true => SitemapFormat::Xml,
            false => SitemapFormat::PlainText,
        }
    }

    pub fn extract_urls(&self, text: &str) -> Vec<String> {
        match self {
            SitemapFormat::Xml => Self::extract_from_xml(text),
            SitemapFormat::PlainText => Self::extract_from_plain_text(text),
        }
    }

    fn extract_from_xml(text: &str) -> Vec<String> {
        let mut reader = quick_xml::Reader::from_str(text);
        let mut urls = Vec::new();
        let mut current: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"loc" => {
                    current = Some(String::new());
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"loc" => {
                    if let Some(loc) = current.take() {
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            urls.push(loc.to_string());
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(loc) = current.as_mut() {
                        match e.decode() {
                            Ok(txt) => loc.push_str(&txt),
                            Err(e) => {
                                log::warn!("[SITEMAP] Invalid <loc> text at {}: {}", reader.buffer_position(), e);
                            }
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(loc) = current.as_mut() {
                        loc.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(loc) = current.as_mut() {
                        if let Some(c) = resolve_reference(&e) {
                            loc.push(c);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("[SITEMAP] Stopping at malformed XML ({}): {}", reader.buffer_position(), e);
                    break;
                }
                _ => {}
            }
        }
        urls
    }

    fn extract_from_plain_text(text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter_map(|token| Url::parse(token).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(|url| url.to_string())
            .collect()
    }
}

fn resolve_reference(reference: &quick_xml::events::BytesRef<'_>) -> Option<char> {
    if let Ok(Some(c)) = reference.resolve_char_ref() {
        return Some(c);
    }
    match reference.decode().ok()?.as_ref() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

pub fn extract_url_from_sitemap(text: &str) -> Vec<String> {
    SitemapFormat::detect(text).extract_urls(text)
}

/// True when the document lists further sitemaps rather than pages.
pub fn is_sitemap_index(text: &str) -> bool {
    text.contains("<sitemapindex") || text.contains(":sitemapindex")
}

/// `Sitemap:` directives of a robots.txt body, in file order.
pub fn robots_sitemaps(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("sitemap")
                .then(|| value.trim().to_string())
        })
        .filter(|value| Url::parse(value).is_ok())
        .collect()
}

/// Finds page URLs listed by a site's sitemap.
///
/// Sources are tried one at a time (robots.txt directives first, then
/// [`SITEMAP_CANDIDATES`]); the first one yielding any URL wins. Nested
/// sitemap indexes are followed up to [`MAX_SITEMAP_DEPTH`] levels. The
/// result is deduplicated, in discovery order, and holds at most `max_urls`.
pub async fn discover_sitemap_urls(
    fetcher: &dyn PageFetcher,
    site_url: &str,
    max_urls: usize,
    timeout: Duration,
) -> Result<Vec<String>> {
    let base = Url::parse(site_url)
        .map_err(|e| AppError::input(format!("Invalid site URL '{}': {}", site_url, e)))?;

    let mut sources = Vec::new();
    if let Ok(robots_url) = base.join("/robots.txt") {
        match fetcher.fetch(robots_url.as_str(), timeout).await {
            Ok(page) => sources.extend(robots_sitemaps(&page.body)),
            Err(e) => log::debug!("[SITEMAP] No robots.txt for {}: {}", base, e),
        }
    }
    for candidate in SITEMAP_CANDIDATES {
        if let Ok(url) = base.join(&format!("/{}", candidate)) {
            let url = url.to_string();
            if !sources.contains(&url) {
                sources.push(url);
            }
        }
    }

    for source in sources {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        collect_sitemap(fetcher, source.clone(), 0, max_urls, timeout, &mut seen, &mut found).await;
        if !found.is_empty() {
            log::info!("[SITEMAP] {} URLs discovered via {}", found.len(), source);
            return Ok(found);
        }
    }

    log::info!("[SITEMAP] No sitemap found for {}", base);
    Ok(Vec::new())
}

/// Depth-first walk of one sitemap tree. Fetch failures below the root are
/// logged and skipped.
fn collect_sitemap<'a>(
    fetcher: &'a dyn PageFetcher,
    url: String,
    depth: usize,
    max_urls: usize,
    timeout: Duration,
    seen: &'a mut HashSet<String>,
    found: &'a mut Vec<String>,
) -> futures::future::BoxFuture<'a, ()> {
    Box::pin(async move {
        if found.len() >= max_urls || !seen.insert(url.clone()) {
            return;
        }
        let page = match fetcher.fetch(&url, timeout).await {
            Ok(page) => page,
            Err(e) => {
                log::debug!("[SITEMAP] Skipping {}: {}", url, e);
                return;
            }
        };

        let urls = extract_url_from_sitemap(&page.body);
        if is_sitemap_index(&page.body) {
            if depth >= MAX_SITEMAP_DEPTH {
                log::debug!("[SITEMAP] Depth limit reached at {}", url);
                return;
            }
            for child in urls {
                collect_sitemap(fetcher, child, depth + 1, max_urls, timeout, seen, found).await;
                if found.len() >= max_urls {
                    return;
                }
            }
            return;
        }

        for page_url in urls {
            if found.len() >= max_urls {
                break;
            }
            if seen.insert(page_url.clone()) {
                found.push(page_url);
            }
        }
    })
}
