//! Search-then-extract pipeline.
//!
//! [`ResultAggregator`] enriches hits concurrently and drops the ones that
//! fail; [`WebSearch`] wires a search client to an aggregator.

mod aggregator;
mod engine;

#[cfg(test)]
mod integration_tests;

pub use aggregator::{AggregationReport, ProcessStats, ResultAggregator};
pub use engine::{search, WebSearch};

/// Best-effort text of a caught panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
