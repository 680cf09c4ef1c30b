//! Observability infrastructure for GreekX
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus exporter bootstrap
//! - Names and descriptions of the offload/fallback metrics
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("greekx", LogFormat::Pretty, "info")?;
//!
//! // Only when metrics are enabled in config
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{describe_metrics, init_metrics};
