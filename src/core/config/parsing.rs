use std::env;
use std::str::FromStr;

use super::types::{ConfigError, Environment};

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

/// Blank values count as unset.
pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

/// Reads `key` as a number, falling back to `default` when unset.
pub(super) fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(value) => parse_number(key, value),
        None => Ok(default),
    }
}

pub(super) fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

fn parse_number<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    let origins: Vec<String> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?
    } else {
        raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
    };

    if origins.is_empty() {
        Ok(default_cors_origins())
    } else {
        Ok(origins)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    let Some(value) = value else {
        return Environment::Development;
    };
    match value.to_ascii_lowercase().as_str() {
        "production" | "prod" => Environment::Production,
        "staging" => Environment::Staging,
        "test" | "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_accept_json_and_csv() {
        let expected = vec!["http://a".to_string(), "http://b".to_string()];
        let json = parse_cors_origins(Some("[\"http://a\",\"http://b\"]".to_string()));
        let csv = parse_cors_origins(Some("http://a, http://b,".to_string()));

        assert_eq!(json.expect("json"), expected);
        assert_eq!(csv.expect("csv"), expected);
    }

    #[test]
    fn cors_origins_fall_back_to_localhost() {
        assert_eq!(parse_cors_origins(None).expect("unset"), default_cors_origins());
        let empty = parse_cors_origins(Some("[]".to_string())).expect("empty");
        assert_eq!(empty, default_cors_origins());
        assert!(parse_cors_origins(Some("[\"http://a\"".to_string())).is_err());
    }

    #[test]
    fn flags_are_case_insensitive() {
        for value in ["1", "true", "YES", "On"] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["0", "false", "off", "maybe"] {
            assert!(!parse_bool(value), "{value}");
        }
    }

    #[test]
    fn numbers_report_the_offending_field() {
        let err = parse_number::<u16>("GRADEPOINT_PORT", "99999".to_string()).unwrap_err();
        assert!(err.to_string().contains("GRADEPOINT_PORT"));
        assert_eq!(parse_number::<f64>("GRADING_TEMPERATURE", "0.2".to_string()).unwrap(), 0.2);
    }

    #[test]
    fn unknown_environments_mean_development() {
        assert_eq!(parse_environment(Some("Prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(Some("qa".to_string())), Environment::Development);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
