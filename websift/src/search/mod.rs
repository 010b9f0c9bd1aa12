//! Search provider access and hit normalization.

mod brave;
mod client;

pub use brave::BraveSearchProvider;
pub use client::{parse_hits, SearchClient};
