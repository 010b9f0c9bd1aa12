//! Readable-text extraction from web pages.
//!
//! - [`HtmlExtractor`] turns an HTML document into plain text
//! - [`WebContentExtractor`] fetches a URL and runs the HTML extractor on it

mod html;
mod web;

pub use html::HtmlExtractor;
pub use web::WebContentExtractor;
