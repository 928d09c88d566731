use crate::config::types::{Config, DispatcherConfig, FilterEntry, NormalizerConfig};
use crate::parse::ParseFilters;
use crate::url::UrlFilters;
use crate::ConfigError;

/// Validates the entire configuration
///
/// Filter identifiers are resolved here so that a typo fails at startup
/// rather than on the first document.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_normalizer_config(&config.normalizer)?;
    validate_dispatcher_config(&config.dispatcher)?;
    validate_url_filters(&config.url_filters)?;
    validate_parse_filters(&config.parse_filters)?;
    Ok(())
}

fn validate_normalizer_config(config: &NormalizerConfig) -> Result<(), ConfigError> {
    if let Some(blank) = config
        .query_elements_to_remove
        .iter()
        .find(|name| name.trim().is_empty())
    {
        return Err(ConfigError::Validation(format!(
            "query_elements_to_remove cannot contain blank names, got '{}'",
            blank
        )));
    }
    Ok(())
}

fn validate_dispatcher_config(config: &DispatcherConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    Ok(())
}

fn validate_url_filters(entries: &[FilterEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        if !UrlFilters::is_registered(&entry.id) {
            return Err(ConfigError::UnknownFilter {
                kind: "URL",
                id: entry.id.clone(),
            });
        }

        if entry.id == "host-deny" {
            let patterns = entry.string_list("patterns");
            if patterns.is_empty() {
                return Err(ConfigError::Validation(
                    "host-deny filter requires at least one pattern".to_string(),
                ));
            }
            for pattern in &patterns {
                validate_domain_pattern(pattern)?;
            }
        }
    }
    Ok(())
}

fn validate_parse_filters(entries: &[FilterEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        if !ParseFilters::is_registered(&entry.id) {
            return Err(ConfigError::UnknownFilter {
                kind: "parse",
                id: entry.id.clone(),
            });
        }
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // Patterns are compared against lowercased hosts
    if domain.chars().any(|c| c.is_uppercase()) {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must be lowercase",
            domain
        )));
    }

    Ok(())
}
