//! Observability utilities.

mod logging;
mod timing;

pub use logging::{init_tracing, LogFormat, DEFAULT_FILTER};
pub use timing::SpanTimer;
