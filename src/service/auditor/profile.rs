//! Audit types as data.
//!
//! Every audit type shares one pipeline and one response envelope; a
//! profile only says which signals to collect, what to grade and how to
//! brief the model.

use crate::domain::models::{AuditType, Criterion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grading {
    /// No deterministic grade sheet.
    None,
    /// The full ten-criterion sheet.
    Core,
    /// Only the listed criteria.
    Scoped(&'static [Criterion]),
}

#[derive(Debug)]
pub struct AuditProfile {
    pub audit_type: AuditType,
    pub role: &'static str,
    pub focus: &'static str,
    pub grading: Grading,
    pub technical: bool,
    pub performance: bool,
    pub include_standards: bool,
}

static PROFILES: [AuditProfile; 7] = [
    AuditProfile {
        audit_type: AuditType::Seo,
        role: "You are a senior SEO consultant auditing a single web page.",
        focus: "Prioritise fixes that move the graded criteria up a letter, most impactful first.",
        grading: Grading::Core,
        technical: false,
        performance: false,
        include_standards: false,
    },
    AuditProfile {
        audit_type: AuditType::Content,
        role: "You are a content strategist reviewing a page for search intent and depth.",
        focus: "Assess topical coverage, keyword usage and readability of the content excerpt.",
        grading: Grading::Core,
        technical: false,
        performance: false,
        include_standards: false,
    },
    AuditProfile {
        audit_type: AuditType::Technical,
        role: "You are a technical SEO engineer reviewing crawlability and markup.",
        focus: "Cover canonicalisation, structured data, HTTPS, headers and indexing directives.",
        grading: Grading::Scoped(&[Criterion::TechnicalSeo, Criterion::SecurityHeaders, Criterion::Https]),
        technical: true,
        performance: false,
        include_standards: false,
    },
    AuditProfile {
        audit_type: AuditType::Performance,
        role: "You are a web performance engineer reviewing a page's loading strategy.",
        focus: "Cover render-blocking resources, third-party weight, image loading and fonts.",
        grading: Grading::Scoped(&[Criterion::RenderBlocking, Criterion::ImageLoading]),
        technical: false,
        performance: true,
        include_standards: false,
    },
    AuditProfile {
        audit_type: AuditType::Accessibility,
        role: "You are an accessibility specialist reviewing a page against WCAG 2.2.",
        focus: "Cover language declaration, landmarks, form labels, headings and image alternatives.",
        grading: Grading::Scoped(&[
            Criterion::Accessibility,
            Criterion::ImageOptimization,
            Criterion::HeadingStructure,
        ]),
        technical: true,
        performance: false,
        include_standards: true,
    },
    AuditProfile {
        audit_type: AuditType::Compliance,
        role: "You are a privacy and compliance auditor reviewing a page for GDPR, ePrivacy and PCI DSS exposure.",
        focus: "Cover cookie consent, tracking before consent, privacy policy access and payment handling.",
        grading: Grading::Scoped(&[Criterion::CookieConsent, Criterion::Https]),
        technical: true,
        performance: false,
        include_standards: true,
    },
    AuditProfile {
        audit_type: AuditType::Security,
        role: "You are an application security reviewer assessing a page's browser-facing defences.",
        focus: "Cover security headers, transport security, mixed content and third-party scripts.",
        grading: Grading::Scoped(&[Criterion::SecurityHeaders, Criterion::Https]),
        technical: true,
        performance: true,
        include_standards: false,
    },
];

impl AuditProfile {
    pub fn for_type(audit_type: AuditType) -> &'static AuditProfile {
        PROFILES
            .iter()
            .find(|p| p.audit_type == audit_type)
            .unwrap_or(&PROFILES[0])
    }

    /// Role, focus and the response-shape contract the model must follow.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "{}\n{}\n\nRespond with a single JSON object and nothing else, shaped as:\n{{\n  \"score\": <integer 0-100>,\n  \"summary\": <string>,\n  \"strengths\": [<string>, ...],\n  \"recommendations\": [{{\"priority\": \"high\" | \"medium\" | \"low\", \"title\": <string>, \"description\": <string>}}, ...]",
            self.role, self.focus
        );
        if self.include_standards {
            prompt.push_str(
                ",\n  \"standards\": [{\"name\": <standard or criterion>, \"status\": \"pass\" | \"fail\" | \"partial\", \"notes\": <string>}, ...]",
            );
        }
        prompt.push_str("\n}\nOrder recommendations by priority. Base every statement on the facts provided.");
        prompt
    }
}
