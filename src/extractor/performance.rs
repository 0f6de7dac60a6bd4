//! Static performance signals readable from markup alone.

use std::collections::BTreeSet;

use url::Url;

use super::page_extractor::{classify_link, resolve, LinkKind, UnparsableLinkPolicy};
use super::patterns::{open_tags, Tag};
use crate::domain::models::{FontStrategy, PerformanceSignals};

/// `markup` is the page with code blocks removed (used for images);
/// `html` is the raw page (used for scripts and head resources).
pub fn extract_performance(markup: &str, html: &str, base: Option<&Url>) -> PerformanceSignals {
    let body_start = body_offset(html);
    let mut signals = PerformanceSignals::default();
    let mut third_party = BTreeSet::new();

    for script in open_tags(html, "script") {
        let Some(src) = script.attrs.get("src").filter(|s| !s.is_empty()) else {
            if !script.attrs.value_eq("type", "application/ld+json") {
                signals.inline_scripts += 1;
            }
            continue;
        };
        signals.script_count += 1;
        note_third_party(src, base, &mut third_party);

        if script.attrs.value_eq("type", "module") {
            signals.module_scripts += 1;
        } else if script.attrs.has("async") {
            signals.async_scripts += 1;
        } else if script.attrs.has("defer") {
            signals.defer_scripts += 1;
        } else if script.offset < body_start {
            signals.blocking_scripts += 1;
        }
    }

    for link in open_tags(html, "link") {
        let href = link.attrs.get("href").unwrap_or("");
        if link.attrs.has_token("rel", "stylesheet") {
            signals.stylesheet_count += 1;
            if is_blocking_stylesheet(&link) {
                signals.blocking_stylesheets += 1;
            }
        }
        if link.attrs.has_token("rel", "preconnect") {
            signals.resource_hints.preconnect += 1;
        }
        if link.attrs.has_token("rel", "dns-prefetch") {
            signals.resource_hints.dns_prefetch += 1;
        }
        if link.attrs.has_token("rel", "preload") {
            signals.resource_hints.preload += 1;
            if link.attrs.value_eq("as", "font") {
                signals.font_strategy.preloaded_fonts += 1;
            }
        }
        if link.attrs.has_token("rel", "prefetch") {
            signals.resource_hints.prefetch += 1;
        }
        if !href.is_empty() && !link.attrs.has_token("rel", "canonical") && !link.attrs.has_token("rel", "alternate") {
            note_third_party(href, base, &mut third_party);
        }
    }

    for img in open_tags(markup, "img") {
        signals.image_count += 1;
        if img.attrs.value_eq("loading", "lazy") {
            signals.lazy_images += 1;
        }
        if img.attrs.has("width") && img.attrs.has("height") {
            signals.images_with_dimensions += 1;
        }
        if let Some(src) = img.attrs.get("src") {
            note_third_party(src, base, &mut third_party);
        }
    }

    for iframe in open_tags(markup, "iframe") {
        if let Some(src) = iframe.attrs.get("src") {
            note_third_party(src, base, &mut third_party);
        }
    }

    signals.font_strategy = FontStrategy {
        preloaded_fonts: signals.font_strategy.preloaded_fonts,
        ..font_strategy(html)
    };
    signals.third_party_domains = third_party.into_iter().collect();
    signals
}

fn body_offset(html: &str) -> usize {
    html.to_ascii_lowercase().find("<body").unwrap_or(usize::MAX)
}

fn is_blocking_stylesheet(link: &Tag) -> bool {
    !(link.attrs.value_eq("media", "print")
        || link.attrs.has_token("rel", "preload")
        || link.attrs.has_token("rel", "alternate")
        || link.attrs.has("disabled"))
}

/// Third-party domain tracking needs a real URL, so unparsable
/// references are skipped.
fn note_third_party(reference: &str, base: Option<&Url>, domains: &mut BTreeSet<String>) {
    if reference.starts_with("data:") {
        return;
    }
    if classify_link(reference, base, UnparsableLinkPolicy::Skip) != Some(LinkKind::External) {
        return;
    }
    if let Some(host) = resolve(reference, base).and_then(|u| u.host_str().map(str::to_string)) {
        domains.insert(host);
    }
}

fn font_strategy(html: &str) -> FontStrategy {
    let lower = html.to_ascii_lowercase();
    FontStrategy {
        google_fonts: lower.contains("fonts.googleapis.com"),
        font_display_swap: lower.contains("font-display:swap")
            || lower.contains("font-display: swap")
            || lower.contains("display=swap"),
        preloaded_fonts: 0,
    }
}
