//! Environment variable substitution for configuration values
//!
//! Configuration files may reference environment variables with the
//! `${VAR_NAME}` syntax, or `${VAR_NAME:-default}` to fall back to a
//! literal when the variable is unset. API keys in particular are
//! usually injected this way rather than committed to the config file.

use once_cell::sync::Lazy;
use regex::Regex;
use std::env;

use crate::config::ConfigError;

/// Matches `${VAR_NAME}` and `${VAR_NAME:-default}` references.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap());

/// Substitute environment variable references in a string.
///
/// References without a default for an unset variable are collected and
/// reported together in one error.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing_vars = Vec::new();
    let mut result = input.to_string();

    for caps in ENV_VAR_PATTERN.captures_iter(input) {
        let full_match = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let var_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let default = caps.get(2).map(|m| m.as_str());

        match env::var(var_name) {
            Ok(value) => {
                result = result.replace(full_match, &value);
            }
            Err(_) => match default {
                Some(fallback) => {
                    result = result.replace(full_match, fallback);
                }
                None => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            },
        }
    }

    if !missing_vars.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Missing environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_plain_text_passes_through() {
        let input = "credentials_dir: ./configs";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_set_variable_substituted() {
        env::set_var("YTS_TEST_KEY", "abc123");
        let result = substitute_env_vars("api_key: ${YTS_TEST_KEY}").unwrap();
        assert_eq!(result, "api_key: abc123");
        env::remove_var("YTS_TEST_KEY");
    }

    #[test]
    fn test_unset_variable_with_default() {
        env::remove_var("YTS_TEST_UNSET");
        let result = substitute_env_vars("port: ${YTS_TEST_UNSET:-8080}").unwrap();
        assert_eq!(result, "port: 8080");
    }

    #[test]
    fn test_set_variable_wins_over_default() {
        env::set_var("YTS_TEST_PORT", "9090");
        let result = substitute_env_vars("port: ${YTS_TEST_PORT:-8080}").unwrap();
        assert_eq!(result, "port: 9090");
        env::remove_var("YTS_TEST_PORT");
    }

    #[test]
    fn test_empty_default_allowed() {
        env::remove_var("YTS_TEST_EMPTY");
        let result = substitute_env_vars("key: '${YTS_TEST_EMPTY:-}'").unwrap();
        assert_eq!(result, "key: ''");
    }

    #[test]
    fn test_missing_variables_reported_together() {
        let result = substitute_env_vars("${YTS_MISSING_A} and ${YTS_MISSING_B}");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("YTS_MISSING_A"));
        assert!(err.to_string().contains("YTS_MISSING_B"));
    }

    #[test]
    fn test_repeated_reference_substituted_everywhere() {
        env::set_var("YTS_TEST_REPEAT", "v");
        let result = substitute_env_vars("${YTS_TEST_REPEAT}-${YTS_TEST_REPEAT}").unwrap();
        assert_eq!(result, "v-v");
        env::remove_var("YTS_TEST_REPEAT");
    }

    #[test]
    fn test_partial_patterns_untouched() {
        let result = substitute_env_vars("$VAR and {VAR} remain unchanged").unwrap();
        assert_eq!(result, "$VAR and {VAR} remain unchanged");
    }
}
