//! Test fixtures for provider responses and pages.

use serde_json::{json, Value};

use crate::models::SearchHit;

/// Builds a Brave-shaped response from `(title, url, description)` triples.
#[must_use]
pub fn brave_response(hits: &[(&str, &str, &str)]) -> Value {
    let results: Vec<Value> = hits
        .iter()
        .map(|(title, url, description)| {
            json!({
                "title": title,
                "url": url,
                "description": description,
            })
        })
        .collect();
    json!({ "web": { "results": results } })
}

/// Builds a page with site chrome around the given paragraphs.
#[must_use]
pub fn html_page(paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    format!(
        "<html><head><title>Test page</title><script>track();</script></head>\
         <body><header><nav>Home | About</nav></header>\
         <article>{body}</article>\
         <footer><p>Copyright notice that is long enough to count</p></footer>\
         </body></html>"
    )
}

/// Creates `n` hits with distinct URLs under `https://example.com/`.
#[must_use]
pub fn sample_hits(n: usize) -> Vec<SearchHit> {
    (0..n)
        .map(|i| {
            SearchHit::new(
                format!("Result {i}"),
                format!("https://example.com/{i}"),
                format!("Snippet {i}"),
            )
        })
        .collect()
}
