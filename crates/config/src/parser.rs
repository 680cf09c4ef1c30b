use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GreeksConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());
    parse_config(&content)
}

/// Parse a YAML document after environment variable substitution
pub fn parse_config(content: &str) -> Result<GreeksConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    // serde_yaml rejects a fully empty document, which should mean "all defaults"
    if substituted.trim().is_empty() {
        return Ok(GreeksConfig::default());
    }

    let config: GreeksConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Load the file if it exists, otherwise fall back to defaults
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<GreeksConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        debug!("No config file at {:?}, using defaults", path);
        Ok(generate_default_config())
    }
}

#[instrument]
pub fn generate_default_config() -> GreeksConfig {
    GreeksConfig::default()
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &GreeksConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_document() {
        assert_eq!(parse_config("").unwrap(), GreeksConfig::default());
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let err = parse_config("offload:\n  request_timeout_ms: soon\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = generate_default_config();
        config.pricing.default_risk_free_rate = 0.065;
        config.fallback.single_fidelity = SingleFallbackFidelity::Full;

        let path = std::env::temp_dir().join(format!("greekx-config-{}.yaml", std::process::id()));
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = load_or_default("/definitely/not/here/greeks.yaml").unwrap();
        assert_eq!(config, GreeksConfig::default());
    }
}
