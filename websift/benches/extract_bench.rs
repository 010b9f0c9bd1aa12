//! Benchmarks for HTML text extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use websift::config::ExtractionConfig;
use websift::extract::HtmlExtractor;
use websift::testing::html_page;

fn extract_benchmark(c: &mut Criterion) {
    let extractor = HtmlExtractor::new(&ExtractionConfig::default()).unwrap();

    let paragraph = "A paragraph of article text that is long enough to be kept by the extractor.";
    let article = html_page(&[paragraph; 50]);
    c.bench_function("extract_paragraphs", |b| {
        b.iter(|| extractor.extract_text(black_box(&article)));
    });

    let divs: String = (0..200).map(|i| format!("<div>Line {i}</div>")).collect();
    let fallback = format!("<html><body><nav>Menu</nav>{divs}</body></html>");
    c.bench_function("extract_body_fallback", |b| {
        b.iter(|| extractor.extract_text(black_box(&fallback)));
    });
}

criterion_group!(benches, extract_benchmark);
criterion_main!(benches);
