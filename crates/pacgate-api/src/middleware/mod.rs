//! # Middleware Stack
//!
//! - [`tracing_layer`]: request/response tracing with `TraceLayer`.
//! - [`metrics`]: Prometheus request and submission metrics.

pub mod metrics;
pub mod tracing_layer;
