//! Configuration for the GreekX engine
//!
//! Loaded from YAML with `${VAR}` substitution; every section and field has a
//! default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct GreeksConfig {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub offload: OffloadConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PricingConfig {
    /// Used when a quote carries no (or a zero) risk-free rate
    #[serde(default = "default_risk_free_rate")]
    pub default_risk_free_rate: f64,
    #[serde(default = "default_days_per_year")]
    pub days_per_year: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_risk_free_rate: default_risk_free_rate(),
            days_per_year: default_days_per_year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OffloadConfig {
    /// When false the background worker is never started and every request
    /// is computed in-process
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            request_timeout_ms: default_request_timeout_ms(),
            worker_thread_name: default_worker_thread_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SingleFallbackFidelity {
    /// Delta only; gamma, theta, vega and rho are zero
    #[default]
    DeltaOnly,
    /// Same calculation as the offloaded path
    Full,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct FallbackConfig {
    #[serde(default)]
    pub single_fidelity: SingleFallbackFidelity,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// pretty, json or compact
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: GreeksConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, GreeksConfig::default());
        assert_eq!(config.pricing.default_risk_free_rate, 0.05);
        assert_eq!(config.offload.request_timeout_ms, 5000);
        assert_eq!(config.fallback.single_fidelity, SingleFallbackFidelity::DeltaOnly);
    }

    #[test]
    fn test_partial_section() {
        let yaml = r#"
offload:
  request_timeout_ms: 250
fallback:
  single_fidelity: full
"#;
        let config: GreeksConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.offload.request_timeout_ms, 250);
        assert!(config.offload.enabled);
        assert_eq!(config.offload.worker_thread_name, "greeks-offload");
        assert_eq!(config.fallback.single_fidelity, SingleFallbackFidelity::Full);
    }
}
