//! Bounded textual briefing for the model.
//!
//! Facts are written as labelled `Label: value` lines grouped under
//! headings. Every long field is cut to a fixed character budget and the
//! whole document is capped, so the prompt size is bounded regardless of
//! the page.

use std::fmt::Write as _;

use super::profile::AuditProfile;
use crate::domain::models::{AuditTarget, GradeSheet, HeadingLevel, KeywordRelevance, PageFacts};
use crate::extractor::patterns::truncate_chars;

/// Budget for single-line fields such as title or meta description.
pub const FIELD_LIMIT: usize = 300;
/// Budget for the body text excerpt.
pub const EXCERPT_LIMIT: usize = 2500;
/// Budget for the business context supplied by the caller.
pub const BUSINESS_CONTEXT_LIMIT: usize = 1000;
/// Maximum headings listed.
pub const HEADING_LIMIT: usize = 25;
/// Maximum items listed for any inventory (domains, trackers, URLs).
pub const LIST_LIMIT: usize = 15;
/// Hard cap on the whole document.
pub const CONTEXT_LIMIT: usize = 12_000;

pub struct ContextBuilder<'a> {
    profile: &'a AuditProfile,
    target: &'a AuditTarget,
    facts: &'a PageFacts,
    relevance: Option<&'a KeywordRelevance>,
    grades: Option<&'a GradeSheet>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(profile: &'a AuditProfile, target: &'a AuditTarget, facts: &'a PageFacts) -> Self {
        Self {
            profile,
            target,
            facts,
            relevance: None,
            grades: None,
        }
    }

    pub fn relevance(mut self, relevance: Option<&'a KeywordRelevance>) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn grades(mut self, grades: Option<&'a GradeSheet>) -> Self {
        self.grades = grades;
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        self.write_page(&mut out);
        self.write_keyword(&mut out);
        self.write_grades(&mut out);
        if self.profile.technical {
            self.write_technical(&mut out);
        }
        if self.profile.performance {
            self.write_performance(&mut out);
        }
        self.write_business(&mut out);
        self.write_excerpt(&mut out);
        truncate_chars(&out, CONTEXT_LIMIT)
    }

    fn write_page(&self, out: &mut String) {
        let f = self.facts;
        section(out, &format!("{} audit", self.profile.audit_type));
        field(out, "Site", &self.target.site_url);
        field(out, "Page", &f.url);
        field(out, "Title", &f.title);
        field(out, "Meta description", &f.meta_description);
        field(out, "Canonical", &f.canonical);
        field(out, "Meta robots", &f.meta_robots);
        field(out, "Viewport", &f.viewport);
        field(out, "Language", &f.lang);
        field(out, "Open Graph title", &f.og_title);
        field(out, "Open Graph description", &f.og_description);
        field(out, "Twitter card", &f.twitter_card);
        field(out, "Word count", &f.word_count.to_string());
        field(
            out,
            "Images",
            &format!("{} total, {} missing alt", f.images.len(), f.images_missing_alt()),
        );
        field(
            out,
            "Links",
            &format!("{} internal, {} external", f.internal_link_count, f.external_link_count),
        );
        field(out, "Hreflang alternates", &f.hreflang_count.to_string());
        field(out, "Schema types", &list(&f.schema_types));

        section(out, "Headings");
        if f.headings.is_empty() {
            out.push_str("(none)\n");
        }
        for heading in f.headings.iter().take(HEADING_LIMIT) {
            let indent = if heading.level == HeadingLevel::H1 { "" } else { "  " };
            let _ = writeln!(
                out,
                "{}H{}: {}",
                indent,
                heading.level.number(),
                truncate_chars(&heading.text, FIELD_LIMIT)
            );
        }
        if f.headings.len() > HEADING_LIMIT {
            let _ = writeln!(out, "... {} more", f.headings.len() - HEADING_LIMIT);
        }
    }

    fn write_keyword(&self, out: &mut String) {
        let Some(r) = self.relevance else {
            return;
        };
        section(out, "Target keyword");
        field(out, "Keyword", &r.keyword);
        field(out, "In title", yes_no(r.in_title));
        field(out, "In H1", yes_no(r.in_h1));
        field(out, "In meta description", yes_no(r.in_meta_description));
        field(out, "In first paragraph", yes_no(r.in_first_paragraph));
        field(out, "Mentions", &r.mention_count.to_string());
        field(out, "Density", &format!("{:.2}%", r.density * 100.0));
    }

    fn write_grades(&self, out: &mut String) {
        let Some(sheet) = self.grades else {
            return;
        };
        section(out, "Deterministic grades");
        field(out, "Overall", sheet.overall_grade.as_str());
        for (criterion, cg) in &sheet.criteria {
            let _ = writeln!(
                out,
                "{}: {} ({}) - {}",
                criterion.label(),
                cg.grade,
                truncate_chars(&cg.value, FIELD_LIMIT),
                cg.notes
            );
        }
    }

    fn write_technical(&self, out: &mut String) {
        section(out, "Technical signals");
        let Some(t) = self.facts.technical.as_ref() else {
            out.push_str("(not collected)\n");
            return;
        };
        field(out, "Protocol", &format!("{:?}", t.protocol).to_uppercase());
        if t.headers_forwarded {
            let h = &t.security_headers;
            field(out, "Strict-Transport-Security", or_missing(&h.hsts));
            field(out, "Content-Security-Policy", or_missing(&h.csp));
            field(out, "X-Frame-Options", or_missing(&h.x_frame_options));
            field(out, "Referrer-Policy", or_missing(&h.referrer_policy));
            field(out, "Permissions-Policy", or_missing(&h.permissions_policy));
        } else {
            field(out, "Security headers", "unavailable (response headers not forwarded)");
        }
        field(out, "Mixed content", &list(&t.mixed_content));
        field(out, "ARIA landmarks", &list(&t.aria_landmarks));
        field(
            out,
            "Form fields labelled",
            &format!("{}/{}", t.labeled_form_fields, t.form_fields),
        );
        let c = &t.compliance;
        field(out, "Consent platforms", &list(&c.consent_providers));
        field(out, "Consent banner markup", yes_no(c.has_consent_banner));
        field(out, "Privacy policy link", yes_no(c.has_privacy_link));
        field(out, "Tracking scripts", &list(&c.tracking_scripts));
        field(out, "Payment form", yes_no(c.has_payment_form));
        field(out, "Payment iframes", &list(&c.payment_iframes));
    }

    fn write_performance(&self, out: &mut String) {
        section(out, "Performance signals");
        let Some(p) = self.facts.performance.as_ref() else {
            out.push_str("(not collected)\n");
            return;
        };
        field(
            out,
            "Scripts",
            &format!(
                "{} external ({} async, {} defer, {} module, {} blocking), {} inline",
                p.script_count, p.async_scripts, p.defer_scripts, p.module_scripts, p.blocking_scripts, p.inline_scripts
            ),
        );
        field(
            out,
            "Stylesheets",
            &format!("{} ({} render-blocking)", p.stylesheet_count, p.blocking_stylesheets),
        );
        let hints = &p.resource_hints;
        field(
            out,
            "Resource hints",
            &format!(
                "preconnect {}, dns-prefetch {}, preload {}, prefetch {}",
                hints.preconnect, hints.dns_prefetch, hints.preload, hints.prefetch
            ),
        );
        field(out, "Third-party domains", &list(&p.third_party_domains));
        field(
            out,
            "Images",
            &format!(
                "{} total, {} lazy, {} with dimensions",
                p.image_count, p.lazy_images, p.images_with_dimensions
            ),
        );
        let fonts = &p.font_strategy;
        field(
            out,
            "Fonts",
            &format!(
                "Google Fonts: {}, font-display swap: {}, preloaded: {}",
                yes_no(fonts.google_fonts),
                yes_no(fonts.font_display_swap),
                fonts.preloaded_fonts
            ),
        );
    }

    fn write_business(&self, out: &mut String) {
        let context = self.target.business_context.trim();
        if context.is_empty() {
            return;
        }
        section(out, "Business context");
        out.push_str(&truncate_chars(context, BUSINESS_CONTEXT_LIMIT));
        out.push('\n');
    }

    fn write_excerpt(&self, out: &mut String) {
        section(out, "Content excerpt");
        if !self.facts.first_paragraph.is_empty() {
            field(out, "First paragraph", &self.facts.first_paragraph);
        }
        out.push_str(&truncate_chars(&self.facts.body_text, EXCERPT_LIMIT));
        out.push('\n');
    }
}

fn section(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "## {}", title);
}

/// Writes `Label: value`, with empty values shown as `(absent)`.
fn field(out: &mut String, label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        let _ = writeln!(out, "{}: (absent)", label);
    } else {
        let _ = writeln!(out, "{}: {}", label, truncate_chars(value, FIELD_LIMIT));
    }
}

fn list(items: &[String]) -> String {
    let mut shown = items.iter().take(LIST_LIMIT).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > LIST_LIMIT {
        let _ = write!(shown, " (+{} more)", items.len() - LIST_LIMIT);
    }
    shown
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn or_missing(value: &str) -> &str {
    if value.is_empty() {
        "missing"
    } else {
        value
    }
}
