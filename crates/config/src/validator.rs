use crate::*;
use thiserror::Error;

const KNOWN_LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const HIGH_RATE_WARNING: f64 = 0.25;
const SHORT_TIMEOUT_WARNING_MS: u64 = 100;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("pricing.default_risk_free_rate must be a finite, non-negative number, got: {0}")]
    InvalidRiskFreeRate(f64),

    #[error("pricing.days_per_year must be positive, got: {0}")]
    InvalidDaysPerYear(f64),

    #[error("offload.request_timeout_ms must be a positive integer")]
    ZeroRequestTimeout,

    #[error("offload.worker_thread_name must not be empty")]
    EmptyWorkerThreadName,

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("metrics.port must be non-zero when metrics are enabled")]
    InvalidMetricsPort,

    #[error("{field} contains an unresolved environment variable: {value}")]
    UnresolvedEnvVar { field: String, value: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &GreeksConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_pricing(&config.pricing, &mut report);
    validate_offload(&config.offload, &mut report);
    validate_logging(&config.logging, &mut report);
    validate_metrics(&config.metrics, &mut report);

    report
}

fn validate_pricing(pricing: &PricingConfig, report: &mut ValidationReport) {
    let rate = pricing.default_risk_free_rate;
    if !rate.is_finite() || rate < 0.0 {
        report.add_error(ValidationError::InvalidRiskFreeRate(rate));
    } else if rate > HIGH_RATE_WARNING {
        report.add_warning(
            "pricing.default_risk_free_rate",
            "rate above 25% looks like a percent value; rates are decimals (0.05 = 5%)",
        );
    } else if rate == 0.0 {
        report.add_warning(
            "pricing.default_risk_free_rate",
            "a zero default is indistinguishable from a missing rate on incoming quotes",
        );
    }

    let days = pricing.days_per_year;
    if !days.is_finite() || days <= 0.0 {
        report.add_error(ValidationError::InvalidDaysPerYear(days));
    }
}

fn validate_offload(offload: &OffloadConfig, report: &mut ValidationReport) {
    if offload.request_timeout_ms == 0 {
        report.add_error(ValidationError::ZeroRequestTimeout);
    } else if offload.request_timeout_ms < SHORT_TIMEOUT_WARNING_MS {
        report.add_warning(
            "offload.request_timeout_ms",
            "timeouts under 100ms will push most large batches onto the in-process fallback",
        );
    }

    if offload.worker_thread_name.trim().is_empty() {
        report.add_error(ValidationError::EmptyWorkerThreadName);
    } else if has_unresolved_env_vars(&offload.worker_thread_name) {
        report.add_error(ValidationError::UnresolvedEnvVar {
            field: "offload.worker_thread_name".to_string(),
            value: offload.worker_thread_name.clone(),
        });
    }

    if !offload.enabled {
        report.add_warning(
            "offload.enabled",
            "offload disabled; all calculations run on the caller's task",
        );
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    let format = logging.format.to_lowercase();
    if !KNOWN_LOG_FORMATS.contains(&format.as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }
}

fn validate_metrics(metrics: &MetricsConfig, report: &mut ValidationReport) {
    if metrics.enabled && metrics.port == 0 {
        report.add_error(ValidationError::InvalidMetricsPort);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let report = validate_config(&GreeksConfig::default());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut config = GreeksConfig::default();
        config.pricing.default_risk_free_rate = -0.01;

        let report = validate_config(&config);
        assert_eq!(report.errors, vec![ValidationError::InvalidRiskFreeRate(-0.01)]);
    }

    #[test]
    fn test_percent_rate_warns() {
        let mut config = GreeksConfig::default();
        config.pricing.default_risk_free_rate = 5.0;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].field, "pricing.default_risk_free_rate");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = GreeksConfig::default();
        config.offload.request_timeout_ms = 0;

        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::ZeroRequestTimeout));
    }

    #[test]
    fn test_disabled_offload_warns() {
        let mut config = GreeksConfig::default();
        config.offload.enabled = false;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "offload.enabled"));
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = GreeksConfig::default();
        config.logging.format = "xml".to_string();

        let report = validate_config(&config);
        assert_eq!(
            report.errors,
            vec![ValidationError::InvalidLogFormat("xml".to_string())]
        );
    }

    #[test]
    fn test_metrics_port_zero() {
        let mut config = GreeksConfig::default();
        config.metrics.enabled = true;
        config.metrics.port = 0;

        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::InvalidMetricsPort));
    }
}
