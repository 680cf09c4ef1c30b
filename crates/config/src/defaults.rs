pub fn default_enabled() -> bool {
    true
}

pub fn default_risk_free_rate() -> f64 {
    0.05
}

pub fn default_days_per_year() -> f64 {
    365.0
}

pub fn default_request_timeout_ms() -> u64 {
    5000
}

pub fn default_worker_thread_name() -> String {
    "greeks-offload".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
