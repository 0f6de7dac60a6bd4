//! Domain entities shared by the extractor, the rubric and the orchestrator.
//!
//! Every textual fact defaults to an empty string rather than `Option`, so
//! grading only ever branches on emptiness.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Response headers with lowercased names.
pub type ResponseHeaders = BTreeMap<String, String>;

// ====== Page facts ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::H1),
            2 => Some(Self::H2),
            3 => Some(Self::H3),
            4 => Some(Self::H4),
            5 => Some(Self::H5),
            6 => Some(Self::H6),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
            Self::H4 => 4,
            Self::H5 => 5,
            Self::H6 => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFact {
    pub src: String,
    /// `alt=""` counts: decorative images are correctly marked up.
    pub has_alt: bool,
    pub lazy: bool,
    pub has_dimensions: bool,
}

/// Everything the extractor learned about one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFacts {
    pub url: String,

    pub title: String,
    pub meta_description: String,
    pub canonical: String,
    pub og_title: String,
    pub og_description: String,
    pub twitter_card: String,
    pub meta_robots: String,
    pub viewport: String,
    pub lang: String,

    pub headings: Vec<Heading>,
    pub body_text: String,
    pub first_paragraph: String,
    /// Counted over the full cleaned body, before `body_text` is capped.
    pub word_count: usize,

    pub images: Vec<ImageFact>,
    pub internal_link_count: usize,
    pub external_link_count: usize,
    pub internal_links: Vec<String>,
    pub hreflang_count: usize,

    pub schema_blocks: Vec<Value>,
    pub schema_types: Vec<String>,

    pub technical: Option<TechnicalSignals>,
    pub performance: Option<PerformanceSignals>,
}

impl PageFacts {
    /// An all-absent record for `url`.
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn headings_at(&self, level: HeadingLevel) -> impl Iterator<Item = &Heading> {
        self.headings.iter().filter(move |h| h.level == level)
    }

    pub fn heading_count(&self, level: HeadingLevel) -> usize {
        self.headings_at(level).count()
    }

    pub fn images_missing_alt(&self) -> usize {
        self.images.iter().filter(|i| !i.has_alt).count()
    }

    pub fn distinct_schema_types(&self) -> BTreeSet<&str> {
        self.schema_types.iter().map(String::as_str).collect()
    }
}

// ====== Technical / compliance signals ======

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Https,
    Http,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityHeaders {
    pub hsts: String,
    pub csp: String,
    pub x_frame_options: String,
    pub referrer_policy: String,
    pub permissions_policy: String,
}

impl SecurityHeaders {
    pub fn present_count(&self) -> usize {
        [
            &self.hsts,
            &self.csp,
            &self.x_frame_options,
            &self.referrer_policy,
            &self.permissions_policy,
        ]
        .iter()
        .filter(|h| !h.is_empty())
        .count()
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.hsts.is_empty() {
            missing.push("Strict-Transport-Security");
        }
        if self.csp.is_empty() {
            missing.push("Content-Security-Policy");
        }
        if self.x_frame_options.is_empty() {
            missing.push("X-Frame-Options");
        }
        if self.referrer_policy.is_empty() {
            missing.push("Referrer-Policy");
        }
        if self.permissions_policy.is_empty() {
            missing.push("Permissions-Policy");
        }
        missing
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSignals {
    pub consent_providers: Vec<String>,
    pub has_consent_banner: bool,
    pub has_privacy_link: bool,
    pub tracking_scripts: Vec<String>,
    pub has_payment_form: bool,
    pub payment_iframes: Vec<String>,
}

impl ComplianceSignals {
    pub fn has_consent_mechanism(&self) -> bool {
        self.has_consent_banner || !self.consent_providers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSignals {
    /// False when the page text arrived without its original response
    /// headers; security header fields are then absent, not missing.
    pub headers_forwarded: bool,
    pub security_headers: SecurityHeaders,
    pub protocol: Protocol,
    pub mixed_content: Vec<String>,
    pub aria_landmarks: Vec<String>,
    pub form_fields: usize,
    pub labeled_form_fields: usize,
    pub compliance: ComplianceSignals,
}

impl TechnicalSignals {
    /// Share of labelable form fields with an associated label; 1.0 when
    /// the page has none.
    pub fn label_coverage(&self) -> f64 {
        if self.form_fields == 0 {
            1.0
        } else {
            self.labeled_form_fields as f64 / self.form_fields as f64
        }
    }
}

// ====== Performance signals ======

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHints {
    pub preconnect: usize,
    pub dns_prefetch: usize,
    pub preload: usize,
    pub prefetch: usize,
}

impl ResourceHints {
    pub fn total(&self) -> usize {
        self.preconnect + self.dns_prefetch + self.preload + self.prefetch
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontStrategy {
    pub google_fonts: bool,
    pub font_display_swap: bool,
    pub preloaded_fonts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSignals {
    pub script_count: usize,
    pub async_scripts: usize,
    pub defer_scripts: usize,
    pub module_scripts: usize,
    pub blocking_scripts: usize,
    pub inline_scripts: usize,
    pub stylesheet_count: usize,
    pub blocking_stylesheets: usize,
    pub resource_hints: ResourceHints,
    pub third_party_domains: Vec<String>,
    pub image_count: usize,
    pub lazy_images: usize,
    pub images_with_dimensions: usize,
    pub font_strategy: FontStrategy,
}

// ====== Keyword relevance ======

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRelevance {
    pub keyword: String,
    pub in_title: bool,
    pub in_h1: bool,
    pub in_meta_description: bool,
    pub in_first_paragraph: bool,
    pub mention_count: usize,
    pub word_count: usize,
    pub density: f64,
}

impl KeywordRelevance {
    /// Number of placements among title, H1, meta description and first paragraph.
    pub fn positions(&self) -> usize {
        [
            self.in_title,
            self.in_h1,
            self.in_meta_description,
            self.in_first_paragraph,
        ]
        .iter()
        .filter(|p| **p)
        .count()
    }
}

// ====== Grades ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn score(self) -> u8 {
        match self {
            Self::A => 4,
            Self::B => 3,
            Self::C => 2,
            Self::D => 1,
            Self::F => 0,
        }
    }

    /// Threshold an averaged score back into a letter.
    pub fn from_average(avg: f64) -> Self {
        if avg >= 3.5 {
            Self::A
        } else if avg >= 2.5 {
            Self::B
        } else if avg >= 1.5 {
            Self::C
        } else if avg >= 0.5 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of graded criteria. The first ten are always computed; the
/// rest only appear for the audit types that request them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "titleTag")]
    TitleTag,
    #[serde(rename = "metaDescription")]
    MetaDescription,
    #[serde(rename = "h1")]
    H1,
    #[serde(rename = "headingStructure")]
    HeadingStructure,
    #[serde(rename = "schemaMarkup")]
    SchemaMarkup,
    #[serde(rename = "keywordOptimization")]
    KeywordOptimization,
    #[serde(rename = "contentVolume")]
    ContentVolume,
    #[serde(rename = "internalLinking")]
    InternalLinking,
    #[serde(rename = "imageOptimization")]
    ImageOptimization,
    #[serde(rename = "technicalSEO")]
    TechnicalSeo,
    #[serde(rename = "securityHeaders")]
    SecurityHeaders,
    #[serde(rename = "https")]
    Https,
    #[serde(rename = "accessibility")]
    Accessibility,
    #[serde(rename = "cookieConsent")]
    CookieConsent,
    #[serde(rename = "renderBlocking")]
    RenderBlocking,
    #[serde(rename = "imageLoading")]
    ImageLoading,
}

impl Criterion {
    pub const CORE: [Criterion; 10] = [
        Criterion::TitleTag,
        Criterion::MetaDescription,
        Criterion::H1,
        Criterion::HeadingStructure,
        Criterion::SchemaMarkup,
        Criterion::KeywordOptimization,
        Criterion::ContentVolume,
        Criterion::InternalLinking,
        Criterion::ImageOptimization,
        Criterion::TechnicalSeo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::TitleTag => "Title Tag",
            Self::MetaDescription => "Meta Description",
            Self::H1 => "H1",
            Self::HeadingStructure => "Heading Structure",
            Self::SchemaMarkup => "Schema Markup",
            Self::KeywordOptimization => "Keyword Optimization",
            Self::ContentVolume => "Content Volume",
            Self::InternalLinking => "Internal Linking",
            Self::ImageOptimization => "Image Optimization",
            Self::TechnicalSeo => "Technical SEO",
            Self::SecurityHeaders => "Security Headers",
            Self::Https => "HTTPS",
            Self::Accessibility => "Accessibility",
            Self::CookieConsent => "Cookie Consent",
            Self::RenderBlocking => "Render Blocking",
            Self::ImageLoading => "Image Loading",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionGrade {
    pub grade: Grade,
    pub value: String,
    pub notes: String,
}

impl CriterionGrade {
    pub fn new(grade: Grade, value: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            grade,
            value: value.into(),
            notes: notes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSheet {
    pub criteria: BTreeMap<Criterion, CriterionGrade>,
    pub overall_grade: Grade,
}

impl GradeSheet {
    pub fn from_criteria(criteria: BTreeMap<Criterion, CriterionGrade>) -> Self {
        let overall_grade = Grade::from_average(Self::average_of(&criteria));
        Self {
            criteria,
            overall_grade,
        }
    }

    pub fn get(&self, criterion: Criterion) -> Option<&CriterionGrade> {
        self.criteria.get(&criterion)
    }

    pub fn grade_of(&self, criterion: Criterion) -> Option<Grade> {
        self.get(criterion).map(|c| c.grade)
    }

    pub fn average_score(&self) -> f64 {
        Self::average_of(&self.criteria)
    }

    fn average_of(criteria: &BTreeMap<Criterion, CriterionGrade>) -> f64 {
        if criteria.is_empty() {
            return 0.0;
        }
        let total: u32 = criteria.values().map(|c| u32::from(c.grade.score())).sum();
        f64::from(total) / criteria.len() as f64
    }
}

// ====== Audit types ======

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditType {
    Seo,
    Content,
    Technical,
    Performance,
    Accessibility,
    Compliance,
    Security,
}

impl AuditType {
    pub const ALL: [AuditType; 7] = [
        AuditType::Seo,
        AuditType::Content,
        AuditType::Technical,
        AuditType::Performance,
        AuditType::Accessibility,
        AuditType::Compliance,
        AuditType::Security,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seo => "seo",
            Self::Content => "content",
            Self::Technical => "technical",
            Self::Performance => "performance",
            Self::Accessibility => "accessibility",
            Self::Compliance => "compliance",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for AuditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seo" | "recommendations" => Ok(Self::Seo),
            "content" => Ok(Self::Content),
            "technical" => Ok(Self::Technical),
            "performance" => Ok(Self::Performance),
            "accessibility" => Ok(Self::Accessibility),
            "compliance" => Ok(Self::Compliance),
            "security" => Ok(Self::Security),
            other => Err(AppError::input(format!("Unknown audit type: {}", other))),
        }
    }
}

// ====== Audit envelope ======

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardCheck {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub notes: String,
}

/// The structured verdict recovered from model output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub standards: Vec<StandardCheck>,
}

/// Shared response envelope for every audit type.
///
/// Failed audits carry `score: 0`, a populated `error`, and empty (never
/// null) `strengths` / `recommendations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub site_url: String,
    pub page_url: String,
    pub audit_type: AuditType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub keyword: Option<String>,
    pub score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub standards: Vec<StandardCheck>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub grades: Option<GradeSheet>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditResult {
    pub fn from_verdict(
        target: &AuditTarget,
        audit_type: AuditType,
        verdict: AuditVerdict,
        grades: Option<GradeSheet>,
    ) -> Self {
        Self {
            site_url: target.site_url.clone(),
            page_url: target.page_url.clone(),
            audit_type,
            keyword: target.keyword.clone(),
            score: verdict.score,
            summary: verdict.summary,
            strengths: verdict.strengths,
            recommendations: verdict.recommendations,
            standards: verdict.standards,
            grades,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Zero-score result embedding `error`.
    pub fn failed(target: &AuditTarget, audit_type: AuditType, error: &AppError) -> Self {
        Self {
            site_url: target.site_url.clone(),
            page_url: target.page_url.clone(),
            audit_type,
            keyword: target.keyword.clone(),
            score: 0,
            summary: String::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
            standards: Vec::new(),
            grades: None,
            error: Some(error.to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// What to audit: one page of one site, optionally against a keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTarget {
    pub site_url: String,
    pub page_url: String,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub business_context: String,
}

impl AuditTarget {
    pub fn new(site_url: impl Into<String>, page_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            page_url: page_url.into(),
            ..Default::default()
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_business_context(mut self, context: impl Into<String>) -> Self {
        self.business_context = context.into();
        self
    }

    /// The keyword, if one was given and is not blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_of(grades: &[Grade]) -> GradeSheet {
        let criteria = Criterion::CORE
            .iter()
            .zip(grades)
            .map(|(c, g)| (*c, CriterionGrade::new(*g, "", "")))
            .collect();
        GradeSheet::from_criteria(criteria)
    }

    #[test]
    fn test_overall_grade_boundary_at_three_and_a_half() {
        // Two criteria: A (4) + B (3) = 3.5
        let sheet = sheet_of(&[Grade::A, Grade::B]);
        assert_eq!(sheet.average_score(), 3.5);
        assert_eq!(sheet.overall_grade, Grade::A);

        assert_eq!(Grade::from_average(3.49), Grade::B);
    }

    #[test]
    fn test_from_average_thresholds() {
        assert_eq!(Grade::from_average(4.0), Grade::A);
        assert_eq!(Grade::from_average(2.5), Grade::B);
        assert_eq!(Grade::from_average(1.5), Grade::C);
        assert_eq!(Grade::from_average(0.5), Grade::D);
        assert_eq!(Grade::from_average(0.49), Grade::F);
    }

    #[test]
    fn test_empty_sheet_grades_f() {
        let sheet = GradeSheet::from_criteria(BTreeMap::new());
        assert_eq!(sheet.overall_grade, Grade::F);
    }

    #[test]
    fn test_criteria_serialize_with_stable_names() {
        let sheet = sheet_of(&[Grade::A; 10]);
        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json["criteria"]["technicalSEO"]["grade"], "A");
        assert_eq!(json["criteria"]["titleTag"]["grade"], "A");
        assert_eq!(json["overallGrade"], "A");
    }

    #[test]
    fn test_audit_type_parsing() {
        assert_eq!("SEO".parse::<AuditType>().unwrap(), AuditType::Seo);
        assert_eq!(
            "recommendations".parse::<AuditType>().unwrap(),
            AuditType::Seo
        );
        assert!(matches!(
            "nonsense".parse::<AuditType>(),
            Err(AppError::InputError(_))
        ));
    }

    #[test]
    fn test_failed_result_has_empty_lists() {
        let target = AuditTarget::new("https://example.com", "https://example.com/a");
        let result = AuditResult::failed(
            &target,
            AuditType::Seo,
            &AppError::fetch("https://example.com/a", "timed out"),
        );
        assert_eq!(result.score, 0);
        assert!(result.strengths.is_empty());
        assert!(result.recommendations.is_empty());
        assert!(result.error.as_deref().unwrap().contains("timed out"));

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["strengths"].as_array().unwrap().is_empty());
        assert!(json["recommendations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_blank_keyword_is_ignored() {
        let target = AuditTarget::new("a", "b").with_keyword("   ");
        assert_eq!(target.keyword(), None);
    }
}
