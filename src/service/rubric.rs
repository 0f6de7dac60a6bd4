//! Deterministic page grading.
//!
//! Each criterion maps facts to a letter through a fixed decision table.
//! A full sheet always holds the ten core criteria; a missing fact yields
//! the worst grade its table allows, never a skipped criterion. Scoped
//! criteria are graded only when an audit type asks for them.

use std::collections::BTreeMap;

use crate::domain::models::{
    Criterion, CriterionGrade, Grade, GradeSheet, HeadingLevel, KeywordRelevance, PageFacts, Protocol,
};

// ====== Thresholds ======

const TITLE_LENGTH: std::ops::RangeInclusive<usize> = 40..=65;
const META_LENGTH: std::ops::RangeInclusive<usize> = 140..=165;
const IMAGE_ALT_SHARE: f64 = 0.7;
const LABEL_COVERAGE: f64 = 0.9;

/// Grades the ten core criteria.
pub fn grade(facts: &PageFacts, relevance: &KeywordRelevance) -> GradeSheet {
    grade_criteria(facts, relevance, &Criterion::CORE)
}

/// Grades exactly `selected`; the overall grade averages only those.
pub fn grade_criteria(facts: &PageFacts, relevance: &KeywordRelevance, selected: &[Criterion]) -> GradeSheet {
    let criteria: BTreeMap<Criterion, CriterionGrade> = selected
        .iter()
        .map(|c| (*c, grade_criterion(*c, facts, relevance)))
        .collect();
    let sheet = GradeSheet::from_criteria(criteria);
    log::debug!(
        "[GRADE] {} - {} criteria, average {:.2}, overall {}",
        facts.url,
        sheet.criteria.len(),
        sheet.average_score(),
        sheet.overall_grade
    );
    sheet
}

pub fn grade_criterion(criterion: Criterion, facts: &PageFacts, relevance: &KeywordRelevance) -> CriterionGrade {
    match criterion {
        Criterion::TitleTag => title_tag(facts, relevance),
        Criterion::MetaDescription => meta_description(facts, relevance),
        Criterion::H1 => h1(facts, relevance),
        Criterion::HeadingStructure => heading_structure(facts),
        Criterion::SchemaMarkup => schema_markup(facts),
        Criterion::KeywordOptimization => keyword_optimization(relevance),
        Criterion::ContentVolume => content_volume(facts),
        Criterion::InternalLinking => internal_linking(facts),
        Criterion::ImageOptimization => image_optimization(facts),
        Criterion::TechnicalSeo => technical_seo(facts),
        Criterion::SecurityHeaders => security_headers(facts),
        Criterion::Https => https(facts),
        Criterion::Accessibility => accessibility(facts),
        Criterion::CookieConsent => cookie_consent(facts),
        Criterion::RenderBlocking => render_blocking(facts),
        Criterion::ImageLoading => image_loading(facts),
    }
}

// ====== Core criteria ======

fn title_tag(facts: &PageFacts, relevance: &KeywordRelevance) -> CriterionGrade {
    if facts.title.is_empty() {
        return CriterionGrade::new(Grade::F, "Missing", "No <title> element found");
    }
    let len = facts.title.chars().count();
    let right_length = TITLE_LENGTH.contains(&len);
    let value = format!("{} chars", len);
    match (relevance.in_title, right_length) {
        (true, true) => CriterionGrade::new(Grade::A, value, "Contains the keyword at an ideal length"),
        (true, false) => CriterionGrade::new(Grade::B, value, "Contains the keyword; aim for 40-65 characters"),
        (false, true) => CriterionGrade::new(Grade::B, value, "Good length but the keyword is missing"),
        (false, false) => CriterionGrade::new(Grade::D, value, "Keyword missing and length outside 40-65 characters"),
    }
}

fn meta_description(facts: &PageFacts, relevance: &KeywordRelevance) -> CriterionGrade {
    if facts.meta_description.is_empty() {
        return CriterionGrade::new(Grade::F, "Missing", "No meta description found");
    }
    let len = facts.meta_description.chars().count();
    let right_length = META_LENGTH.contains(&len);
    let value = format!("{} chars", len);
    match (relevance.in_meta_description, right_length) {
        (true, true) => CriterionGrade::new(Grade::A, value, "Contains the keyword at an ideal length"),
        (true, false) => CriterionGrade::new(Grade::B, value, "Contains the keyword; aim for 140-165 characters"),
        (false, true) => CriterionGrade::new(Grade::C, value, "Good length but the keyword is missing"),
        (false, false) => CriterionGrade::new(Grade::D, value, "Keyword missing and length outside 140-165 characters"),
    }
}

fn h1(facts: &PageFacts, relevance: &KeywordRelevance) -> CriterionGrade {
    let count = facts.heading_count(HeadingLevel::H1);
    let value = format!("{} H1", count);
    match (count, relevance.in_h1) {
        (0, _) => CriterionGrade::new(Grade::F, "Missing", "No H1 heading found"),
        (1, true) => CriterionGrade::new(Grade::A, value, "Single H1 containing the keyword"),
        (1, false) => CriterionGrade::new(Grade::B, value, "Single H1 without the keyword"),
        (_, true) => CriterionGrade::new(Grade::C, value, "Multiple H1s; one contains the keyword"),
        (_, false) => CriterionGrade::new(Grade::D, value, "Multiple H1s and none contain the keyword"),
    }
}

fn heading_structure(facts: &PageFacts) -> CriterionGrade {
    let h1 = facts.heading_count(HeadingLevel::H1);
    let h2 = facts.heading_count(HeadingLevel::H2);
    let h3 = facts.heading_count(HeadingLevel::H3);
    let value = format!("H1: {}, H2: {}, H3: {}", h1, h2, h3);

    if facts.headings.is_empty() {
        CriterionGrade::new(Grade::F, "No headings", "Page has no headings")
    } else if h1 == 1 && h2 >= 3 && h3 > 0 {
        CriterionGrade::new(Grade::A, value, "One H1 with a full H2/H3 hierarchy")
    } else if h1 >= 1 && h2 > 0 {
        CriterionGrade::new(Grade::B, value, "H1 and H2 present; deepen the hierarchy")
    } else if h1 >= 1 {
        CriterionGrade::new(Grade::C, value, "H1 present but no H2 sections")
    } else {
        CriterionGrade::new(Grade::D, value, "Headings present but no H1")
    }
}

fn schema_markup(facts: &PageFacts) -> CriterionGrade {
    let types = facts.distinct_schema_types();
    let value = types.iter().copied().collect::<Vec<_>>().join(", ");
    match types.len() {
        0 => CriterionGrade::new(Grade::F, "None", "No JSON-LD structured data found"),
        1 => CriterionGrade::new(Grade::B, value, "One schema type; consider adding more"),
        _ => CriterionGrade::new(Grade::A, value, "Multiple schema types present"),
    }
}

fn keyword_optimization(relevance: &KeywordRelevance) -> CriterionGrade {
    let positions = relevance.positions();
    let value = format!(
        "{} of 4 positions, {} mentions ({:.2}% density)",
        positions,
        relevance.mention_count,
        relevance.density * 100.0
    );
    if positions >= 3 && relevance.mention_count >= 3 {
        CriterionGrade::new(Grade::A, value, "Keyword well placed and used throughout")
    } else if positions >= 2 {
        CriterionGrade::new(Grade::B, value, "Keyword in several key positions")
    } else if positions >= 1 {
        CriterionGrade::new(Grade::C, value, "Keyword in only one key position")
    } else {
        CriterionGrade::new(Grade::F, value, "Keyword absent from title, H1, meta description and first paragraph")
    }
}

fn content_volume(facts: &PageFacts) -> CriterionGrade {
    let words = facts.word_count;
    let value = format!("{} words", words);
    let (grade, notes) = match words {
        w if w >= 2000 => (Grade::A, "In-depth content"),
        w if w >= 1000 => (Grade::B, "Substantial content"),
        w if w >= 500 => (Grade::C, "Moderate content"),
        w if w >= 300 => (Grade::D, "Thin content"),
        _ => (Grade::F, "Very little content"),
    };
    CriterionGrade::new(grade, value, notes)
}

fn internal_linking(facts: &PageFacts) -> CriterionGrade {
    let links = facts.internal_link_count;
    let value = format!("{} internal links", links);
    let (grade, notes) = match links {
        l if l >= 10 => (Grade::A, "Well linked into the site"),
        l if l >= 5 => (Grade::B, "Reasonable internal linking"),
        l if l >= 2 => (Grade::C, "Few internal links"),
        _ => (Grade::F, "Almost no internal links"),
    };
    CriterionGrade::new(grade, value, notes)
}

fn image_optimization(facts: &PageFacts) -> CriterionGrade {
    let total = facts.images.len();
    if total == 0 {
        return CriterionGrade::new(Grade::D, "0 images", "No images on the page");
    }
    let missing = facts.images_missing_alt();
    let with_alt = total - missing;
    let value = format!("{}/{} images with alt", with_alt, total);
    if missing == 0 {
        CriterionGrade::new(Grade::A, value, "Every image has alt text")
    } else if with_alt as f64 / total as f64 >= IMAGE_ALT_SHARE {
        CriterionGrade::new(Grade::B, value, "Most images have alt text")
    } else {
        CriterionGrade::new(Grade::D, value, "Many images lack alt text")
    }
}

fn technical_seo(facts: &PageFacts) -> CriterionGrade {
    let canonical = !facts.canonical.is_empty();
    let schema = !facts.schema_types.is_empty();
    let value = format!(
        "canonical: {}, schema: {}",
        if canonical { "yes" } else { "no" },
        if schema { "yes" } else { "no" }
    );
    match (canonical, schema) {
        (true, true) => CriterionGrade::new(Grade::A, value, "Canonical and structured data present"),
        (true, false) | (false, true) => CriterionGrade::new(Grade::C, value, "Only one of canonical and structured data present"),
        (false, false) => CriterionGrade::new(Grade::F, value, "Neither canonical nor structured data present"),
    }
}

// ====== Scoped criteria ======

fn unavailable(group: &str) -> CriterionGrade {
    CriterionGrade::new(Grade::F, "Unavailable", format!("{} signals were not collected", group))
}

fn security_headers(facts: &PageFacts) -> CriterionGrade {
    let Some(technical) = facts.technical.as_ref() else {
        return unavailable("Technical");
    };
    if !technical.headers_forwarded {
        return CriterionGrade::new(Grade::F, "Unavailable", "Response headers were not forwarded");
    }
    let headers = &technical.security_headers;
    let present = headers.present_count();
    let missing = headers.missing();
    let value = format!("{}/5 headers", present);
    let notes = if missing.is_empty() {
        "All recommended security headers present".to_string()
    } else {
        format!("Missing: {}", missing.join(", "))
    };
    let grade = match present {
        5 => Grade::A,
        4 => Grade::B,
        3 => Grade::C,
        1 | 2 => Grade::D,
        _ => Grade::F,
    };
    CriterionGrade::new(grade, value, notes)
}

fn https(facts: &PageFacts) -> CriterionGrade {
    let Some(technical) = facts.technical.as_ref() else {
        return unavailable("Technical");
    };
    let mixed = technical.mixed_content.len();
    match technical.protocol {
        Protocol::Https if mixed == 0 => CriterionGrade::new(Grade::A, "HTTPS", "Served securely with no mixed content"),
        Protocol::Https => CriterionGrade::new(
            Grade::C,
            format!("HTTPS, {} insecure resources", mixed),
            "Mixed content loaded over HTTP",
        ),
        Protocol::Http | Protocol::Unknown => CriterionGrade::new(Grade::F, "HTTP", "Page is not served over HTTPS"),
    }
}

fn accessibility(facts: &PageFacts) -> CriterionGrade {
    let Some(technical) = facts.technical.as_ref() else {
        return unavailable("Technical");
    };
    let has_lang = !facts.lang.is_empty();
    let has_landmark = !technical.aria_landmarks.is_empty();
    let labels_ok = technical.label_coverage() >= LABEL_COVERAGE;
    let points = [has_lang, has_landmark, labels_ok].iter().filter(|p| **p).count();
    let value = format!(
        "lang: {}, landmarks: {}, labelled fields: {}/{}",
        if has_lang { facts.lang.as_str() } else { "missing" },
        technical.aria_landmarks.len(),
        technical.labeled_form_fields,
        technical.form_fields
    );
    let grade = match points {
        3 => Grade::A,
        2 => Grade::B,
        1 => Grade::C,
        _ => Grade::F,
    };
    CriterionGrade::new(grade, value, format!("{} of 3 accessibility checks pass", points))
}

fn cookie_consent(facts: &PageFacts) -> CriterionGrade {
    let Some(technical) = facts.technical.as_ref() else {
        return unavailable("Technical");
    };
    let compliance = &technical.compliance;
    let consent = compliance.has_consent_mechanism();
    let privacy = compliance.has_privacy_link;
    let tracking = !compliance.tracking_scripts.is_empty();
    let value = format!(
        "consent: {}, privacy link: {}, trackers: {}",
        if consent { "yes" } else { "no" },
        if privacy { "yes" } else { "no" },
        compliance.tracking_scripts.len()
    );
    match (consent, privacy) {
        (true, true) => CriterionGrade::new(Grade::A, value, "Consent mechanism and privacy policy link present"),
        (true, false) | (false, true) => CriterionGrade::new(Grade::C, value, "Only one of consent mechanism and privacy link present"),
        (false, false) if tracking => CriterionGrade::new(Grade::F, value, "Tracking scripts load without consent or privacy policy"),
        (false, false) => CriterionGrade::new(Grade::D, value, "No consent mechanism or privacy policy link"),
    }
}

fn render_blocking(facts: &PageFacts) -> CriterionGrade {
    let Some(performance) = facts.performance.as_ref() else {
        return unavailable("Performance");
    };
    let blocking = performance.blocking_scripts + performance.blocking_stylesheets;
    let value = format!(
        "{} blocking scripts, {} blocking stylesheets",
        performance.blocking_scripts, performance.blocking_stylesheets
    );
    let (grade, notes) = match blocking {
        0 => (Grade::A, "No render-blocking resources"),
        1..=2 => (Grade::B, "Few render-blocking resources"),
        3..=4 => (Grade::C, "Several render-blocking resources"),
        5..=6 => (Grade::D, "Many render-blocking resources"),
        _ => (Grade::F, "Rendering is heavily blocked"),
    };
    CriterionGrade::new(grade, value, notes)
}

fn image_loading(facts: &PageFacts) -> CriterionGrade {
    let Some(performance) = facts.performance.as_ref() else {
        return unavailable("Performance");
    };
    let total = performance.image_count;
    if total == 0 {
        return CriterionGrade::new(Grade::A, "0 images", "No images to optimise");
    }
    let lazy_share = performance.lazy_images as f64 / total as f64;
    let sized_share = performance.images_with_dimensions as f64 / total as f64;
    let score = (lazy_share + sized_share) / 2.0;
    let value = format!(
        "{}/{} lazy, {}/{} sized",
        performance.lazy_images, total, performance.images_with_dimensions, total
    );
    let grade = if score >= 0.9 {
        Grade::A
    } else if score >= 0.7 {
        Grade::B
    } else if score >= 0.5 {
        Grade::C
    } else if score >= 0.25 {
        Grade::D
    } else {
        Grade::F
    };
    CriterionGrade::new(grade, value, format!("{:.0}% loading coverage", score * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ComplianceSignals, Heading, ImageFact, PerformanceSignals, SecurityHeaders, TechnicalSignals,
    };
    use crate::extractor::PageExtractor;
    use crate::service::keyword;
    use crate::test_utils::mocks;

    fn relevance_with(in_title: bool) -> KeywordRelevance {
        KeywordRelevance {
            keyword: "rental".into(),
            in_title,
            ..Default::default()
        }
    }

    fn facts_with_title(len: usize) -> PageFacts {
        let mut title = String::from("rental ");
        while title.chars().count() < len {
            title.push('x');
        }
        PageFacts {
            title,
            ..Default::default()
        }
    }

    #[test]
    fn test_title_length_boundary() {
        let sheet = grade(&facts_with_title(40), &relevance_with(true));
        assert_eq!(sheet.grade_of(Criterion::TitleTag), Some(Grade::A));

        let sheet = grade(&facts_with_title(39), &relevance_with(true));
        assert_eq!(sheet.grade_of(Criterion::TitleTag), Some(Grade::B));

        let sheet = grade(&facts_with_title(65), &relevance_with(true));
        assert_eq!(sheet.grade_of(Criterion::TitleTag), Some(Grade::A));

        let sheet = grade(&facts_with_title(66), &relevance_with(false));
        assert_eq!(sheet.grade_of(Criterion::TitleTag), Some(Grade::D));
    }

    #[test]
    fn test_meta_description_table() {
        let long = "m".repeat(150);
        let facts = PageFacts {
            meta_description: long,
            ..Default::default()
        };
        let mut relevance = KeywordRelevance::default();
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::MetaDescription), Some(Grade::C));
        relevance.in_meta_description = true;
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::MetaDescription), Some(Grade::A));
    }

    #[test]
    fn test_h1_table() {
        let h1 = |text: &str| Heading {
            level: HeadingLevel::H1,
            text: text.into(),
        };
        let mut facts = PageFacts::default();
        let mut relevance = KeywordRelevance::default();
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::H1), Some(Grade::F));

        facts.headings = vec![h1("a"), h1("b")];
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::H1), Some(Grade::D));
        relevance.in_h1 = true;
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::H1), Some(Grade::C));

        facts.headings = vec![h1("a")];
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::H1), Some(Grade::A));
    }

    #[test]
    fn test_title_right_length_without_keyword() {
        let sheet = grade(&facts_with_title(50), &relevance_with(false));
        assert_eq!(sheet.grade_of(Criterion::TitleTag), Some(Grade::B));
    }

    #[test]
    fn test_meta_description_keyword_at_wrong_length() {
        let facts = PageFacts {
            meta_description: "rental ".repeat(5),
            ..Default::default()
        };
        let relevance = KeywordRelevance {
            in_meta_description: true,
            ..Default::default()
        };
        assert_eq!(grade(&facts, &relevance).grade_of(Criterion::MetaDescription), Some(Grade::B));
    }

    #[test]
    fn test_logo_h1_counts_as_single_h1() {
        let html = r#"<h1><a href="/"><img src="/logo.png" alt="Acme Rentals"></a></h1><h2>Plans</h2><p>Pick one.</p>"#;
        let facts = PageExtractor::extract(html, "https://example.com/");
        let relevance = keyword::analyze(&facts, "rentals");
        let sheet = grade(&facts, &relevance);
        assert_eq!(sheet.grade_of(Criterion::H1), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::HeadingStructure), Some(Grade::B));
    }

    fn headings(h1: usize, h2: usize, h3: usize) -> PageFacts {
        let mut list = Vec::new();
        for (level, count) in [(HeadingLevel::H1, h1), (HeadingLevel::H2, h2), (HeadingLevel::H3, h3)] {
            list.extend((0..count).map(|i| Heading {
                level,
                text: format!("heading {}", i),
            }));
        }
        PageFacts {
            headings: list,
            ..Default::default()
        }
    }

    #[test]
    fn test_heading_structure_table() {
        let r = KeywordRelevance::default();
        let of = |facts: PageFacts| grade_criterion(Criterion::HeadingStructure, &facts, &r).grade;

        assert_eq!(of(headings(0, 0, 0)), Grade::F);
        assert_eq!(of(headings(1, 3, 1)), Grade::A);
        assert_eq!(of(headings(1, 3, 0)), Grade::B);
        assert_eq!(of(headings(2, 3, 1)), Grade::B);
        assert_eq!(of(headings(1, 1, 0)), Grade::B);
        assert_eq!(of(headings(1, 0, 2)), Grade::C);
        assert_eq!(of(headings(0, 2, 1)), Grade::D);
    }

    #[test]
    fn test_schema_types_are_counted_once() {
        let r = KeywordRelevance::default();
        let mut facts = PageFacts {
            schema_types: vec!["Article".into()],
            ..Default::default()
        };
        assert_eq!(grade(&facts, &r).grade_of(Criterion::SchemaMarkup), Some(Grade::B));

        facts.schema_types.push("Article".into());
        assert_eq!(grade(&facts, &r).grade_of(Criterion::SchemaMarkup), Some(Grade::B));

        facts.schema_types.push("FAQPage".into());
        assert_eq!(grade(&facts, &r).grade_of(Criterion::SchemaMarkup), Some(Grade::A));
    }

    #[test]
    fn test_technical_seo_table() {
        let r = KeywordRelevance::default();
        let of = |canonical: &str, schema: &[&str]| {
            let facts = PageFacts {
                canonical: canonical.into(),
                schema_types: schema.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            };
            grade_criterion(Criterion::TechnicalSeo, &facts, &r).grade
        };

        assert_eq!(of("https://example.com/", &["Article"]), Grade::A);
        assert_eq!(of("https://example.com/", &[]), Grade::C);
        assert_eq!(of("", &["Article"]), Grade::C);
        assert_eq!(of("", &[]), Grade::F);
    }

    #[test]
    fn test_keyword_optimization_table() {
        let facts = PageFacts::default();
        let of = |relevance: KeywordRelevance| grade_criterion(Criterion::KeywordOptimization, &facts, &relevance).grade;
        let placed = |title, h1, meta, mentions| KeywordRelevance {
            in_title: title,
            in_h1: h1,
            in_meta_description: meta,
            mention_count: mentions,
            ..Default::default()
        };

        assert_eq!(of(placed(true, true, true, 3)), Grade::A);
        assert_eq!(of(placed(true, true, true, 2)), Grade::B);
        assert_eq!(of(placed(true, true, false, 10)), Grade::B);
        assert_eq!(of(placed(true, false, false, 10)), Grade::C);
        assert_eq!(of(placed(false, false, false, 10)), Grade::F);
    }

    #[test]
    fn test_content_volume_boundaries() {
        let r = KeywordRelevance::default();
        let of = |word_count| {
            let facts = PageFacts {
                word_count,
                ..Default::default()
            };
            grade_criterion(Criterion::ContentVolume, &facts, &r).grade
        };

        assert_eq!(of(299), Grade::F);
        assert_eq!(of(300), Grade::D);
        assert_eq!(of(499), Grade::D);
        assert_eq!(of(500), Grade::C);
        assert_eq!(of(999), Grade::C);
        assert_eq!(of(1000), Grade::B);
        assert_eq!(of(1999), Grade::B);
        assert_eq!(of(2000), Grade::A);
    }

    #[test]
    fn test_internal_linking_boundaries() {
        let r = KeywordRelevance::default();
        let of = |internal_link_count| {
            let facts = PageFacts {
                internal_link_count,
                ..Default::default()
            };
            grade_criterion(Criterion::InternalLinking, &facts, &r).grade
        };

        assert_eq!(of(0), Grade::F);
        assert_eq!(of(1), Grade::F);
        assert_eq!(of(2), Grade::C);
        assert_eq!(of(4), Grade::C);
        assert_eq!(of(5), Grade::B);
        assert_eq!(of(9), Grade::B);
        assert_eq!(of(10), Grade::A);
    }

    #[test]
    fn test_grading_is_pure() {
        let facts = PageExtractor::extract(&mocks::scenario_page(), "https://example.com/rental-calculator");
        let relevance = keyword::analyze(&facts, "rental calculator");
        assert_eq!(grade(&facts, &relevance), grade(&facts, &relevance));
    }

    #[test]
    fn test_well_optimised_page_grades_a() {
        let facts = PageExtractor::extract(&mocks::scenario_page(), "https://example.com/rental-calculator");
        let relevance = keyword::analyze(&facts, "rental calculator");
        let sheet = grade(&facts, &relevance);

        assert_eq!(sheet.grade_of(Criterion::H1), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::SchemaMarkup), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::ContentVolume), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::InternalLinking), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::ImageOptimization), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::TechnicalSeo), Some(Grade::A));
        assert_eq!(sheet.grade_of(Criterion::KeywordOptimization), Some(Grade::A));
        assert_eq!(sheet.criteria.len(), 10);
        assert_eq!(sheet.overall_grade, Grade::A);
    }

    #[test]
    fn test_empty_page_grades_f() {
        let facts = PageExtractor::extract("", "https://example.com/");
        let relevance = keyword::analyze(&facts, "anything");
        let sheet = grade(&facts, &relevance);

        assert_eq!(sheet.criteria.len(), 10);
        for (criterion, cg) in &sheet.criteria {
            assert!(
                matches!(cg.grade, Grade::F | Grade::D),
                "{:?} graded {:?}",
                criterion,
                cg.grade
            );
        }
        assert_eq!(sheet.grade_of(Criterion::ImageOptimization), Some(Grade::D));
        assert_eq!(sheet.overall_grade, Grade::F);
    }

    #[test]
    fn test_image_alt_share() {
        let image = |has_alt| ImageFact {
            has_alt,
            ..Default::default()
        };
        let mut facts = PageFacts {
            images: vec![image(true), image(true), image(true), image(false)],
            ..Default::default()
        };
        let r = KeywordRelevance::default();
        assert_eq!(grade(&facts, &r).grade_of(Criterion::ImageOptimization), Some(Grade::B));
        facts.images.push(image(false));
        assert_eq!(grade(&facts, &r).grade_of(Criterion::ImageOptimization), Some(Grade::D));
    }

    #[test]
    fn test_scoped_criteria_only_when_requested() {
        let facts = PageFacts::default();
        let r = KeywordRelevance::default();
        assert!(grade(&facts, &r).get(Criterion::Https).is_none());

        let sheet = grade_criteria(&facts, &r, &[Criterion::Https, Criterion::RenderBlocking]);
        assert_eq!(sheet.criteria.len(), 2);
        assert_eq!(sheet.overall_grade, Grade::F);
        assert_eq!(sheet.grade_of(Criterion::Https), Some(Grade::F));
        assert_eq!(sheet.get(Criterion::RenderBlocking).unwrap().value, "Unavailable");
    }

    fn technical_facts(technical: TechnicalSignals) -> PageFacts {
        PageFacts {
            lang: "en".into(),
            technical: Some(technical),
            ..Default::default()
        }
    }

    #[test]
    fn test_security_headers_count() {
        let headers = SecurityHeaders {
            hsts: "max-age=1".into(),
            csp: "default-src 'self'".into(),
            x_frame_options: "DENY".into(),
            ..Default::default()
        };
        let facts = technical_facts(TechnicalSignals {
            headers_forwarded: true,
            security_headers: headers,
            ..Default::default()
        });
        let cg = grade_criterion(Criterion::SecurityHeaders, &facts, &KeywordRelevance::default());
        assert_eq!(cg.grade, Grade::C);
        assert!(cg.notes.contains("Referrer-Policy"));
    }

    #[test]
    fn test_https_with_mixed_content() {
        let facts = technical_facts(TechnicalSignals {
            protocol: Protocol::Https,
            mixed_content: vec!["http://cdn.example.com/a.js".into()],
            ..Default::default()
        });
        let cg = grade_criterion(Criterion::Https, &facts, &KeywordRelevance::default());
        assert_eq!(cg.grade, Grade::C);
    }

    #[test]
    fn test_accessibility_points() {
        let facts = technical_facts(TechnicalSignals {
            aria_landmarks: vec!["main".into()],
            form_fields: 4,
            labeled_form_fields: 2,
            ..Default::default()
        });
        let cg = grade_criterion(Criterion::Accessibility, &facts, &KeywordRelevance::default());
        assert_eq!(cg.grade, Grade::B);
    }

    #[test]
    fn test_cookie_consent_table() {
        let with = |compliance: ComplianceSignals| {
            let facts = technical_facts(TechnicalSignals {
                compliance,
                ..Default::default()
            });
            grade_criterion(Criterion::CookieConsent, &facts, &KeywordRelevance::default()).grade
        };
        assert_eq!(with(ComplianceSignals::default()), Grade::D);
        assert_eq!(
            with(ComplianceSignals {
                tracking_scripts: vec!["Google Analytics".into()],
                ..Default::default()
            }),
            Grade::F
        );
        assert_eq!(
            with(ComplianceSignals {
                has_privacy_link: true,
                ..Default::default()
            }),
            Grade::C
        );
        assert_eq!(
            with(ComplianceSignals {
                has_consent_banner: true,
                has_privacy_link: true,
                ..Default::default()
            }),
            Grade::A
        );
    }

    #[test]
    fn test_render_blocking_and_image_loading() {
        let facts = PageFacts {
            performance: Some(PerformanceSignals {
                blocking_scripts: 2,
                blocking_stylesheets: 1,
                image_count: 4,
                lazy_images: 4,
                images_with_dimensions: 2,
                ..Default::default()
            }),
            ..Default::default()
        };
        let r = KeywordRelevance::default();
        assert_eq!(grade_criterion(Criterion::RenderBlocking, &facts, &r).grade, Grade::C);
        // (1.0 + 0.5) / 2 = 0.75
        assert_eq!(grade_criterion(Criterion::ImageLoading, &facts, &r).grade, Grade::B);
    }
}
