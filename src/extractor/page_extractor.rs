use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

use super::patterns::{self, elements, open_tags, remove_elements, strip_tags};
use super::{performance, technical};
use crate::domain::models::{Heading, HeadingLevel, ImageFact, PageFacts, ResponseHeaders};

/// Character budget for `PageFacts::body_text`.
pub const BODY_TEXT_LIMIT: usize = 4000;
/// Maximum number of resolved internal URLs kept on `PageFacts`.
pub const INTERNAL_LINK_SAMPLE: usize = 50;

/// Markup that never contributes to headings, images or links.
const CODE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];
/// Markup ignored when reading document metadata; comments are always dropped.
const METADATA_EXCLUDED: &[&str] = &["svg"];
/// Markup stripped before body text is flattened.
const BOILERPLATE_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "head", "title", "nav", "header", "footer",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Internal,
    External,
}

/// What to do with an href that cannot be resolved into a URL.
///
/// Both policies exist on purpose: link counting is conservative and
/// treats such hrefs as internal, while anything that needs a real URL
/// (link samples, third-party domains) drops them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnparsableLinkPolicy {
    CountAsInternal,
    Skip,
}

/// Optional inputs and signal groups for one extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions<'a> {
    /// Original response headers, when the fetch forwarded them.
    pub headers: Option<&'a ResponseHeaders>,
    pub technical: bool,
    pub performance: bool,
}

pub struct PageExtractor;

impl PageExtractor {
    /// Core facts only; technical and performance signals stay `None`.
    pub fn extract(html: &str, page_url: &str) -> PageFacts {
        Self::extract_with(html, page_url, &ExtractOptions::default())
    }

    /// Never fails: every field that cannot be matched takes its absent value.
    pub fn extract_with(html: &str, page_url: &str, options: &ExtractOptions<'_>) -> PageFacts {
        let base = Url::parse(page_url).ok();
        let source = remove_elements(html, METADATA_EXCLUDED);
        let markup = remove_elements(html, CODE_ELEMENTS);
        let content = remove_elements(html, BOILERPLATE_ELEMENTS);

        let full_text = strip_tags(&content);
        let word_count = full_text.split_whitespace().count();
        let (schema_blocks, schema_types) = Self::extract_schema(&source);
        let (internal_link_count, external_link_count) = Self::count_links(&markup, base.as_ref());

        let facts = PageFacts {
            url: page_url.to_string(),
            title: Self::extract_title(&source),
            meta_description: Self::extract_meta(&source, "description"),
            canonical: Self::extract_canonical(&source),
            og_title: Self::extract_meta(&source, "og:title"),
            og_description: Self::extract_meta(&source, "og:description"),
            twitter_card: Self::extract_meta(&source, "twitter:card"),
            meta_robots: Self::extract_meta(&source, "robots"),
            viewport: Self::extract_meta(&source, "viewport"),
            lang: Self::extract_lang(&source),
            headings: Self::extract_headings(&markup),
            body_text: patterns::truncate_chars(&full_text, BODY_TEXT_LIMIT),
            first_paragraph: Self::extract_first_paragraph(&content),
            word_count,
            images: Self::extract_images(&markup),
            internal_link_count,
            external_link_count,
            internal_links: Self::internal_link_urls(&markup, base.as_ref(), INTERNAL_LINK_SAMPLE),
            hreflang_count: Self::count_hreflang(&source),
            schema_blocks,
            schema_types,
            technical: options
                .technical
                .then(|| technical::extract_technical(&source, page_url, options.headers)),
            performance: options
                .performance
                .then(|| performance::extract_performance(&markup, &source, base.as_ref())),
        };

        log::debug!(
            "[EXTRACT] {} - title: {} chars, {} headings, {} words, {} images, {}/{} links, {} schema types",
            page_url,
            facts.title.chars().count(),
            facts.headings.len(),
            facts.word_count,
            facts.images.len(),
            facts.internal_link_count,
            facts.external_link_count,
            facts.schema_types.len()
        );

        facts
    }

    pub fn extract_title(html: &str) -> String {
        elements(html, "title")
            .first()
            .map(|el| strip_tags(el.inner))
            .unwrap_or_default()
    }

    /// Content of the first `<meta>` whose `name` or `property` equals `key`.
    pub fn extract_meta(html: &str, key: &str) -> String {
        open_tags(html, "meta")
            .find(|tag| tag.attrs.value_eq("name", key) || tag.attrs.value_eq("property", key))
            .and_then(|tag| tag.attrs.get("content").map(patterns::collapse_whitespace))
            .unwrap_or_default()
    }

    pub fn extract_canonical(html: &str) -> String {
        open_tags(html, "link")
            .find(|tag| tag.attrs.has_token("rel", "canonical"))
            .and_then(|tag| tag.attrs.get("href").map(str::to_string))
            .unwrap_or_default()
    }

    pub fn extract_lang(html: &str) -> String {
        open_tags(html, "html")
            .next()
            .and_then(|tag| tag.attrs.get("lang").map(str::to_string))
            .unwrap_or_default()
    }

    /// All H1-H6 headings in document order, nested markup flattened.
    /// A heading without text takes the alt text of its images, and is
    /// kept with empty text when it has none.
    pub fn extract_headings(html: &str) -> Vec<Heading> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());

        re.captures_iter(html)
            .filter_map(|caps| {
                let level = caps[1].parse::<u8>().ok().and_then(HeadingLevel::from_number)?;
                let mut text = strip_tags(&caps[2]);
                if text.is_empty() {
                    text = image_alt_text(&caps[2]);
                }
                Some(Heading { level, text })
            })
            .collect()
    }

    /// Text of the first non-empty `<p>` block.
    pub fn extract_first_paragraph(html: &str) -> String {
        elements(html, "p")
            .iter()
            .map(|p| strip_tags(p.inner))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    pub fn extract_images(html: &str) -> Vec<ImageFact> {
        open_tags(html, "img")
            .map(|tag| {
                let src = tag
                    .attrs
                    .get("src")
                    .filter(|s| !s.is_empty())
                    .or_else(|| tag.attrs.get("data-src"))
                    .unwrap_or_default()
                    .to_string();
                ImageFact {
                    src,
                    has_alt: tag.attrs.has("alt"),
                    lazy: tag.attrs.value_eq("loading", "lazy"),
                    has_dimensions: tag.attrs.has("width") && tag.attrs.has("height"),
                }
            })
            .collect()
    }

    /// Anchor hrefs worth classifying: fragments and non-navigational
    /// schemes are dropped.
    pub fn anchor_hrefs(html: &str) -> impl Iterator<Item = String> + '_ {
        open_tags(html, "a")
            .filter_map(|tag| tag.attrs.get("href").map(str::to_string))
            .filter(|href| {
                let lower = href.to_ascii_lowercase();
                !(href.is_empty()
                    || href.starts_with('#')
                    || lower.starts_with("javascript:")
                    || lower.starts_with("mailto:")
                    || lower.starts_with("tel:")
                    || lower.starts_with("data:"))
            })
    }

    /// (internal, external) anchor counts. Unparsable hrefs count as internal.
    pub fn count_links(html: &str, base: Option<&Url>) -> (usize, usize) {
        let mut internal = 0;
        let mut external = 0;
        for href in Self::anchor_hrefs(html) {
            match classify_link(&href, base, UnparsableLinkPolicy::CountAsInternal) {
                Some(LinkKind::Internal) => internal += 1,
                Some(LinkKind::External) => external += 1,
                None => {}
            }
        }
        (internal, external)
    }

    /// Distinct resolved internal URLs, fragments stripped. Unparsable
    /// hrefs are skipped since a URL is required here.
    pub fn internal_link_urls(html: &str, base: Option<&Url>, limit: usize) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for href in Self::anchor_hrefs(html) {
            if urls.len() >= limit {
                break;
            }
            if classify_link(&href, base, UnparsableLinkPolicy::Skip) != Some(LinkKind::Internal) {
                continue;
            }
            let Some(mut url) = resolve(&href, base) else {
                continue;
            };
            url.set_fragment(None);
            let url = url.to_string();
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    pub fn count_hreflang(html: &str) -> usize {
        open_tags(html, "link")
            .filter(|tag| tag.attrs.has_token("rel", "alternate") && tag.attrs.has("hreflang"))
            .count()
    }

    /// Parsed JSON-LD blocks and every `@type` found in them, including
    /// `@graph` members. Malformed blocks are skipped.
    pub fn extract_schema(html: &str) -> (Vec<Value>, Vec<String>) {
        let mut blocks = Vec::new();
        let mut types = Vec::new();

        for script in elements(html, "script") {
            if !script.attrs.value_eq("type", "application/ld+json") {
                continue;
            }
            match serde_json::from_str::<Value>(script.inner.trim()) {
                Ok(value) => {
                    collect_schema_types(&value, &mut types);
                    blocks.push(value);
                }
                Err(e) => {
                    log::debug!("[EXTRACT] Skipping malformed JSON-LD block: {}", e);
                }
            }
        }

        (blocks, types)
    }
}

pub(crate) fn resolve(href: &str, base: Option<&Url>) -> Option<Url> {
    match base {
        Some(base) => base.join(href).ok(),
        None => Url::parse(href).ok(),
    }
}

/// Internal when the resolved host equals the page host.
pub fn classify_link(
    href: &str,
    base: Option<&Url>,
    policy: UnparsableLinkPolicy,
) -> Option<LinkKind> {
    match resolve(href, base) {
        Some(url) => {
            let base_host = base.and_then(|b| b.host_str());
            if url.host_str().is_some() && url.host_str() == base_host {
                Some(LinkKind::Internal)
            } else {
                Some(LinkKind::External)
            }
        }
        None => match policy {
            UnparsableLinkPolicy::CountAsInternal => Some(LinkKind::Internal),
            UnparsableLinkPolicy::Skip => None,
        },
    }
}

fn image_alt_text(fragment: &str) -> String {
    let alts: Vec<String> = open_tags(fragment, "img")
        .filter_map(|tag| tag.attrs.get("alt").map(patterns::collapse_whitespace))
        .filter(|alt| !alt.is_empty())
        .collect();
    alts.join(" ")
}

fn collect_schema_types(value: &Value, types: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_schema_types(item, types)),
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => types.push(t.clone()),
                Some(Value::Array(ts)) => types.extend(
                    ts.iter()
                        .filter_map(|t| t.as_str())
                        .map(str::to_string),
                ),
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_schema_types(graph, types);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mocks;

    const PAGE: &str = "https://example.com/blog/post";

    #[test]
    fn test_empty_html_yields_absent_facts() {
        let facts = PageExtractor::extract("", PAGE);
        assert_eq!(facts.url, PAGE);
        assert!(facts.title.is_empty());
        assert!(facts.meta_description.is_empty());
        assert!(facts.canonical.is_empty());
        assert!(facts.headings.is_empty());
        assert!(facts.body_text.is_empty());
        assert_eq!(facts.word_count, 0);
        assert_eq!(facts.internal_link_count + facts.external_link_count, 0);
        assert!(facts.schema_types.is_empty());
        assert!(facts.technical.is_none());
    }

    #[test]
    fn test_garbage_input_does_not_panic() {
        let inputs = [
            "<<<>>>",
            "<title>unterminated",
            "<h1><h2>nested</h1></h2>",
            "<a href=\"http://[::1\">bad</a>",
            "<script type=\"application/ld+json\">{</script>",
            "\u{0}\u{feff}<meta content>",
        ];
        for html in inputs {
            let _ = PageExtractor::extract(html, PAGE);
            let _ = PageExtractor::extract(html, "not a url");
        }
    }

    #[test]
    fn test_metadata_extraction() {
        let html = r#"
            <html lang="en-GB"><head>
              <title>  Best   <b>Rental</b> Calculator </title>
              <meta name="Description" content="Work out rental yield.">
              <meta property="og:title" content="OG Title">
              <meta property="og:description" content="OG Description">
              <meta name="twitter:card" content="summary_large_image">
              <meta name="viewport" content="width=device-width, initial-scale=1">
              <link rel="canonical" href="https://example.com/blog/post">
              <link rel="alternate" hreflang="de" href="https://example.com/de/blog/post">
            </head></html>"#;

        let facts = PageExtractor::extract(html, PAGE);
        assert_eq!(facts.title, "Best Rental Calculator");
        assert_eq!(facts.meta_description, "Work out rental yield.");
        assert_eq!(facts.og_title, "OG Title");
        assert_eq!(facts.og_description, "OG Description");
        assert_eq!(facts.twitter_card, "summary_large_image");
        assert_eq!(facts.canonical, "https://example.com/blog/post");
        assert_eq!(facts.lang, "en-GB");
        assert_eq!(facts.hreflang_count, 1);
        assert!(facts.viewport.contains("device-width"));
    }

    #[test]
    fn test_headings_keep_document_order_and_all_levels() {
        let html = "<h2>Second</h2><h1>First <em>one</em></h1><h6>Deep</h6><h3>\n Three \n</h3>";
        let headings = PageExtractor::extract_headings(html);
        let summary: Vec<_> = headings
            .iter()
            .map(|h| (h.level.number(), h.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(2, "Second"), (1, "First one"), (6, "Deep"), (3, "Three")]
        );
    }

    #[test]
    fn test_logo_heading_uses_image_alt() {
        let html = r#"<h1><a href="/"><img src="/logo.png" alt="Acme Rentals"></a></h1><h2>Plans</h2><h3><img src="/x.png"></h3>"#;
        let headings = PageExtractor::extract_headings(html);
        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0].level, HeadingLevel::H1);
        assert_eq!(headings[0].text, "Acme Rentals");
        assert_eq!(headings[2].level, HeadingLevel::H3);
        assert_eq!(headings[2].text, "");

        let facts = PageExtractor::extract(html, PAGE);
        assert_eq!(facts.heading_count(HeadingLevel::H1), 1);
    }

    #[test]
    fn test_metadata_ignores_comments_and_inline_svg() {
        let html = r#"<html><head>
              <!-- <meta name="description" content="Old copy"> -->
              <!-- <link rel="canonical" href="https://example.com/old"> -->
            </head><body>
              <svg><title>Search icon</title></svg>
              <h1>Pricing</h1>
            </body></html>"#;

        let facts = PageExtractor::extract(html, PAGE);
        assert_eq!(facts.meta_description, "");
        assert_eq!(facts.canonical, "");
        assert_eq!(facts.title, "");
    }

    #[test]
    fn test_body_text_excludes_boilerplate() {
        let html = r#"<html><head><title>T</title><style>.a{}</style></head><body>
            <header>Site Header</header>
            <nav><a href="/">Home</a> <a href="/about">About</a></nav>
            <main><p>Real content here.</p><script>track("nope")</script></main>
            <footer>Copyright</footer></body></html>"#;
        let facts = PageExtractor::extract(html, PAGE);
        assert_eq!(facts.body_text, "Real content here.");
        assert_eq!(facts.word_count, 3);
        assert_eq!(facts.first_paragraph, "Real content here.");
    }

    #[test]
    fn test_body_text_is_capped_but_word_count_is_not() {
        let html = mocks::html_with_words(2500);
        let facts = PageExtractor::extract(&html, PAGE);
        assert!(facts.body_text.chars().count() <= BODY_TEXT_LIMIT);
        assert!(facts.word_count >= 2500);
    }

    #[test]
    fn test_first_paragraph_skips_empty_blocks() {
        let html = "<p>  </p><p><span>Hello</span> there</p><p>Later</p>";
        assert_eq!(PageExtractor::extract_first_paragraph(html), "Hello there");
    }

    #[test]
    fn test_empty_alt_counts_as_present() {
        let html = r#"<img src="a.png" alt=""><img src="b.png" alt="Chart"><img src="c.png"><img data-src="d.png" loading="lazy" width="10" height="10">"#;
        let images = PageExtractor::extract_images(html);
        assert_eq!(images.len(), 4);
        assert!(images[0].has_alt);
        assert!(images[1].has_alt);
        assert!(!images[2].has_alt);
        assert_eq!(images[3].src, "d.png");
        assert!(images[3].lazy && images[3].has_dimensions);
    }

    #[test]
    fn test_link_classification_by_hostname() {
        let html = r##"
            <a href="/pricing">Pricing</a>
            <a href="https://example.com/contact#form">Contact</a>
            <a href="https://other.org/">Other</a>
            <a href="#top">Top</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>"##;
        let base = Url::parse(PAGE).unwrap();
        assert_eq!(PageExtractor::count_links(html, Some(&base)), (2, 1));

        let urls = PageExtractor::internal_link_urls(html, Some(&base), 10);
        assert_eq!(
            urls,
            vec![
                "https://example.com/pricing".to_string(),
                "https://example.com/contact".to_string()
            ]
        );
    }

    #[test]
    fn test_unparsable_links_follow_call_site_policy() {
        let html = r#"<a href="http://[broken">x</a><a href="relative/page">y</a>"#;

        // Counting treats unparsable hrefs as internal.
        assert_eq!(
            classify_link("http://[broken", None, UnparsableLinkPolicy::CountAsInternal),
            Some(LinkKind::Internal)
        );
        // Without a base URL the relative href cannot resolve either.
        assert_eq!(PageExtractor::count_links(html, None), (2, 0));

        // URL-requiring call sites drop them.
        assert_eq!(
            classify_link("http://[broken", None, UnparsableLinkPolicy::Skip),
            None
        );
        assert!(PageExtractor::internal_link_urls(html, None, 10).is_empty());
    }

    #[test]
    fn test_schema_extraction_skips_malformed_blocks() {
        let html = r#"
            <script type="application/ld+json">{"@type": "Organization"}</script>
            <script type="application/ld+json">{ not json }</script>
            <script type="application/ld+json">
              {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage"}, {"@type": ["Article", "NewsArticle"]}
              ]}
            </script>
            <script>{"@type": "Ignored"}</script>"#;
        let (blocks, types) = PageExtractor::extract_schema(html);
        assert_eq!(blocks.len(), 2);
        assert_eq!(types, vec!["Organization", "WebPage", "Article", "NewsArticle"]);
    }

    #[test]
    fn test_signal_groups_are_opt_in() {
        let options = ExtractOptions {
            headers: None,
            technical: true,
            performance: true,
        };
        let facts = PageExtractor::extract_with("<html></html>", PAGE, &options);
        assert!(facts.technical.is_some());
        assert!(facts.performance.is_some());
    }
}
