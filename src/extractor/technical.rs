//! Technical, accessibility and compliance signals.
//!
//! Security headers come from the fetch's response headers, never from
//! the markup. When a page is analysed from text alone the header fields
//! stay empty and `headers_forwarded` is false, so callers can tell
//! "not sent" apart from "not known".

use std::collections::BTreeSet;

use url::Url;

use super::patterns::{all_open_tags, elements, open_tags, strip_tags, Tag};
use crate::domain::models::{
    ComplianceSignals, Protocol, ResponseHeaders, SecurityHeaders, TechnicalSignals,
};

/// Maximum number of mixed-content URLs reported.
pub const MIXED_CONTENT_LIMIT: usize = 20;

const CONSENT_PROVIDERS: &[(&str, &str)] = &[
    ("cookiebot", "Cookiebot"),
    ("onetrust", "OneTrust"),
    ("cookielaw.org", "OneTrust"),
    ("cookieyes", "CookieYes"),
    ("termly", "Termly"),
    ("iubenda", "iubenda"),
    ("quantcast", "Quantcast Choice"),
    ("osano", "Osano"),
    ("trustarc", "TrustArc"),
    ("didomi", "Didomi"),
    ("usercentrics", "Usercentrics"),
    ("complianz", "Complianz"),
];

const CONSENT_BANNER_MARKERS: &[&str] = &[
    "cookie-consent",
    "cookieconsent",
    "cookie-banner",
    "cookie_banner",
    "cookie-notice",
    "cookie_notice",
    "consent-banner",
    "gdpr-consent",
];

const TRACKERS: &[(&str, &str)] = &[
    ("google-analytics.com", "Google Analytics"),
    ("gtag(", "Google Analytics"),
    ("googletagmanager.com", "Google Tag Manager"),
    ("connect.facebook.net", "Meta Pixel"),
    ("fbq(", "Meta Pixel"),
    ("static.hotjar.com", "Hotjar"),
    ("clarity.ms", "Microsoft Clarity"),
    ("snap.licdn.com", "LinkedIn Insight"),
    ("analytics.tiktok.com", "TikTok Pixel"),
];

const PAYMENT_HOSTS: &[&str] = &[
    "stripe.com",
    "paypal.com",
    "braintreegateway.com",
    "squareup.com",
    "adyen.com",
    "checkout.com",
    "klarna.com",
];

const CARD_FIELD_MARKERS: &[&str] = &["cc-number", "cardnumber", "card-number", "card_number", "cvc", "cvv"];

pub fn extract_technical(
    html: &str,
    page_url: &str,
    headers: Option<&ResponseHeaders>,
) -> TechnicalSignals {
    let protocol = detect_protocol(page_url);
    let (form_fields, labeled_form_fields) = form_label_coverage(html);

    TechnicalSignals {
        headers_forwarded: headers.is_some(),
        security_headers: headers.map(security_headers).unwrap_or_default(),
        protocol,
        mixed_content: find_mixed_content(html, protocol),
        aria_landmarks: aria_landmarks(html),
        form_fields,
        labeled_form_fields,
        compliance: compliance_signals(html),
    }
}

pub fn security_headers(headers: &ResponseHeaders) -> SecurityHeaders {
    let get = |name: &str| {
        headers
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    SecurityHeaders {
        hsts: get("strict-transport-security"),
        csp: get("content-security-policy"),
        x_frame_options: get("x-frame-options"),
        referrer_policy: get("referrer-policy"),
        permissions_policy: get("permissions-policy"),
    }
}

pub fn detect_protocol(page_url: &str) -> Protocol {
    match Url::parse(page_url).map(|u| u.scheme().to_string()) {
        Ok(scheme) if scheme == "https" => Protocol::Https,
        Ok(scheme) if scheme == "http" => Protocol::Http,
        _ => Protocol::Unknown,
    }
}

/// Plain-HTTP subresources on an HTTPS page.
pub fn find_mixed_content(html: &str, protocol: Protocol) -> Vec<String> {
    if protocol != Protocol::Https {
        return Vec::new();
    }

    let mut found: Vec<String> = Vec::new();
    for tag in all_open_tags(html) {
        let url = match tag.name.as_str() {
            "img" | "script" | "iframe" | "source" | "video" | "audio" | "embed" | "track" => {
                tag.attrs.get("src")
            }
            "object" => tag.attrs.get("data"),
            "link" if is_subresource_link(&tag) => tag.attrs.get("href"),
            _ => None,
        };
        if let Some(url) = url {
            if url.to_ascii_lowercase().starts_with("http://") && !found.iter().any(|f| f == url) {
                found.push(url.to_string());
                if found.len() >= MIXED_CONTENT_LIMIT {
                    break;
                }
            }
        }
    }
    found
}

fn is_subresource_link(tag: &Tag) -> bool {
    ["stylesheet", "icon", "preload", "modulepreload"]
        .iter()
        .any(|rel| tag.attrs.has_token("rel", rel))
}

/// Landmark roles present, from semantic elements or explicit `role`.
pub fn aria_landmarks(html: &str) -> Vec<String> {
    let mut roles = BTreeSet::new();
    for tag in all_open_tags(html) {
        let implicit = match tag.name.as_str() {
            "main" => Some("main"),
            "nav" => Some("navigation"),
            "header" => Some("banner"),
            "footer" => Some("contentinfo"),
            "aside" => Some("complementary"),
            "search" => Some("search"),
            _ => None,
        };
        if let Some(role) = implicit {
            roles.insert(role.to_string());
        }
        if let Some(role) = tag.attrs.get("role") {
            let role = role.to_ascii_lowercase();
            if matches!(
                role.as_str(),
                "main" | "navigation" | "banner" | "contentinfo" | "complementary" | "search" | "region" | "form"
            ) {
                roles.insert(role);
            }
        }
    }
    roles.into_iter().collect()
}

fn is_labelable(tag: &Tag) -> bool {
    match tag.name.as_str() {
        "select" | "textarea" => true,
        "input" => !matches!(
            tag.attrs
                .get("type")
                .unwrap_or("text")
                .to_ascii_lowercase()
                .as_str(),
            "hidden" | "submit" | "button" | "reset" | "image"
        ),
        _ => false,
    }
}

fn has_direct_label(tag: &Tag, label_targets: &BTreeSet<String>) -> bool {
    tag.attrs.get("aria-label").is_some_and(|v| !v.is_empty())
        || tag.attrs.has("aria-labelledby")
        || tag
            .attrs
            .get("id")
            .is_some_and(|id| label_targets.contains(id))
}

/// (labelable fields, fields with a label). A field is labelled by
/// `aria-label`, `aria-labelledby`, a `<label for>` or by being wrapped
/// in a `<label>`.
pub fn form_label_coverage(html: &str) -> (usize, usize) {
    let labels = elements(html, "label");
    let label_targets: BTreeSet<String> = labels
        .iter()
        .filter_map(|l| l.attrs.get("for").map(str::to_string))
        .collect();

    let fields: Vec<Tag> = all_open_tags(html).filter(is_labelable).collect();
    let directly_labeled = fields
        .iter()
        .filter(|f| has_direct_label(f, &label_targets))
        .count();

    let wrapped: usize = labels
        .iter()
        .map(|label| {
            all_open_tags(label.inner)
                .filter(is_labelable)
                .filter(|f| !has_direct_label(f, &label_targets))
                .count()
        })
        .sum();

    let total = fields.len();
    (total, (directly_labeled + wrapped).min(total))
}

pub fn compliance_signals(html: &str) -> ComplianceSignals {
    let lower = html.to_ascii_lowercase();

    let consent_providers = distinct_names(CONSENT_PROVIDERS, &lower);
    let tracking_scripts = distinct_names(TRACKERS, &lower);
    let has_consent_banner = CONSENT_BANNER_MARKERS.iter().any(|m| lower.contains(m));

    let has_privacy_link = elements(html, "a").iter().any(|a| {
        let href = a.attrs.get("href").unwrap_or("").to_ascii_lowercase();
        href.contains("privacy") || strip_tags(a.inner).to_ascii_lowercase().contains("privacy")
    });

    let has_payment_form = open_tags(html, "input").any(|input| {
        ["autocomplete", "name", "id"].iter().any(|attr| {
            let value = input.attrs.get(attr).unwrap_or("").to_ascii_lowercase();
            CARD_FIELD_MARKERS.iter().any(|m| value.contains(m))
        })
    });

    let mut payment_iframes = Vec::new();
    for iframe in open_tags(html, "iframe") {
        let Some(host) = iframe
            .attrs
            .get("src")
            .and_then(|src| Url::parse(src).ok())
            .and_then(|u| u.host_str().map(str::to_string))
        else {
            continue;
        };
        if PAYMENT_HOSTS
            .iter()
            .any(|p| host == *p || host.ends_with(&format!(".{}", p)))
            && !payment_iframes.contains(&host)
        {
            payment_iframes.push(host);
        }
    }

    ComplianceSignals {
        consent_providers,
        has_consent_banner,
        has_privacy_link,
        tracking_scripts,
        has_payment_form,
        payment_iframes,
    }
}

fn distinct_names(table: &[(&str, &str)], haystack: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (marker, name) in table {
        if haystack.contains(marker) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
