//! Keyword placement and frequency for one page.

use crate::domain::models::{HeadingLevel, KeywordRelevance, PageFacts};

/// Case-insensitive placement checks plus a non-overlapping mention count
/// over `body_text`. Pure: identical inputs always give identical output.
///
/// A blank keyword matches nowhere and has no mentions.
pub fn analyze(facts: &PageFacts, keyword: &str) -> KeywordRelevance {
    let needle = keyword.trim().to_lowercase();
    let word_count = facts.body_text.split_whitespace().count();

    if needle.is_empty() {
        return KeywordRelevance {
            keyword: keyword.trim().to_string(),
            word_count,
            ..Default::default()
        };
    }

    let contains = |text: &str| text.to_lowercase().contains(&needle);
    let mention_count = count_mentions(&facts.body_text, &needle);

    KeywordRelevance {
        keyword: keyword.trim().to_string(),
        in_title: contains(&facts.title),
        in_h1: facts.headings_at(HeadingLevel::H1).any(|h| contains(&h.text)),
        in_meta_description: contains(&facts.meta_description),
        in_first_paragraph: contains(&facts.first_paragraph),
        mention_count,
        word_count,
        density: density(mention_count, word_count),
    }
}

/// Scans left to right, resuming after the end of each match.
fn count_mentions(text: &str, lowered_needle: &str) -> usize {
    text.to_lowercase().matches(lowered_needle).count()
}

fn density(mentions: usize, words: usize) -> f64 {
    if words == 0 {
        0.0
    } else {
        mentions as f64 / words as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Heading;

    fn facts() -> PageFacts {
        PageFacts {
            title: "Best Rental Calculator".into(),
            meta_description: "Free tool".into(),
            headings: vec![
                Heading {
                    level: HeadingLevel::H2,
                    text: "Rental calculator FAQ".into(),
                },
                Heading {
                    level: HeadingLevel::H1,
                    text: "Estimate rent".into(),
                },
            ],
            first_paragraph: "Use our RENTAL CALCULATOR today.".into(),
            body_text: "Use our rental calculator today. The rental calculator is free.".into(),
            ..PageFacts::empty("https://example.com")
        }
    }

    #[test]
    fn test_placements_are_case_insensitive() {
        let r = analyze(&facts(), "Rental Calculator");
        assert!(r.in_title);
        assert!(!r.in_h1, "only H1 headings count");
        assert!(!r.in_meta_description);
        assert!(r.in_first_paragraph);
        assert_eq!(r.mention_count, 2);
        assert_eq!(r.word_count, 10);
        assert!((r.density - 0.2).abs() < f64::EPSILON);
        assert_eq!(r.positions(), 2);
    }

    #[test]
    fn test_mentions_do_not_overlap() {
        let facts = PageFacts {
            body_text: "aaa".into(),
            ..Default::default()
        };
        assert_eq!(analyze(&facts, "aa").mention_count, 1);
    }

    #[test]
    fn test_density_is_zero_without_words() {
        let r = analyze(&PageFacts::default(), "anything");
        assert_eq!(r.word_count, 0);
        assert_eq!(r.density, 0.0);
        assert!(r.density.is_finite());
    }

    #[test]
    fn test_blank_keyword_matches_nothing() {
        let r = analyze(&facts(), "   ");
        assert_eq!(r.positions(), 0);
        assert_eq!(r.mention_count, 0);
        assert_eq!(r.density, 0.0);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let f = facts();
        assert_eq!(analyze(&f, "rental"), analyze(&f, "rental"));
    }
}
