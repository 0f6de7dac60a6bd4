// benches/extraction_benchmarks.rs
use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use std::{hint::black_box, time::Duration};

use seo_auditor::domain::models::ResponseHeaders;
use seo_auditor::extractor::{ExtractOptions, PageExtractor};
use seo_auditor::service::{keyword, rubric};

const PAGE_URL: &str = "https://example.com/guides/rental-yield";

/// A content-heavy page: nav, JSON-LD, headings, images, scripts and
/// roughly `sections * 120` words of body text.
fn large_page(sections: usize) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html><html lang="en"><head><title>Rental yield guide</title>
<meta name="description" content="How to calculate rental yield.">
<link rel="canonical" href="https://example.com/guides/rental-yield">
<link rel="preconnect" href="https://fonts.gstatic.com">
<link rel="stylesheet" href="/main.css">
<script src="https://www.googletagmanager.com/gtag/js?id=G-1"></script>
<script type="application/ld+json">{"@type":"Article","headline":"Rental yield"}</script>
</head><body><nav>"#,
    );
    for i in 0..40 {
        html.push_str(&format!(r#"<a href="/guides/{}">Guide {}</a>"#, i, i));
    }
    html.push_str("</nav><main><h1>Rental yield guide</h1>");
    for i in 0..sections {
        html.push_str(&format!("<h2>Section {}</h2>", i));
        html.push_str("<p>");
        html.push_str(&"Gross rental yield divides annual rent by the purchase price of the property. ".repeat(10));
        html.push_str("</p>");
        html.push_str(&format!(
            r#"<img src="/img/{}.png" alt="Figure {}" loading="lazy" width="640" height="480">"#,
            i, i
        ));
    }
    html.push_str(r#"<form><label for="e">Email</label><input id="e" type="email"></form>"#);
    html.push_str("</main><footer>Example Ltd</footer></body></html>");
    html
}

fn bench_extraction(c: &mut Criterion) {
    let html = large_page(200);
    let headers: ResponseHeaders = BTreeMap::from([
        ("strict-transport-security".to_string(), "max-age=63072000".to_string()),
        ("content-security-policy".to_string(), "default-src 'self'".to_string()),
    ]);

    c.bench_function("extract_core_facts", |b| {
        b.iter(|| black_box(PageExtractor::extract(black_box(&html), PAGE_URL)))
    });

    c.bench_function("extract_all_signals", |b| {
        let options = ExtractOptions {
            headers: Some(&headers),
            technical: true,
            performance: true,
        };
        b.iter(|| black_box(PageExtractor::extract_with(black_box(&html), PAGE_URL, &options)))
    });

    let facts = PageExtractor::extract(&html, PAGE_URL);
    c.bench_function("analyze_and_grade", |b| {
        b.iter(|| {
            let relevance = keyword::analyze(black_box(&facts), "rental yield");
            black_box(rubric::grade(&facts, &relevance))
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(10));
    targets = bench_extraction
}

criterion_main!(benches);
