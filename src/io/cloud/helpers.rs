//! Generic helpers shared by the cloud IO wrappers.
//!
//! - [`config_from_env`] - Collect prefixed environment variables
//! - [`required_setting`] / [`parse_setting`] - Pull typed values out of them
//! - [`validate_resource_name`] - Validate bucket, table and queue names

use crate::io::cloud::traits::{CloudIOError, CloudResult, ErrorKind};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Config Helpers
// ============================================================================

/// Helper for loading config from environment variables
///
/// Keys are returned with the prefix stripped and lowercased, so
/// `APP_QUEUE_PREFIX` read with prefix `APP_` becomes `queue_prefix`.
#[must_use]
pub fn config_from_env(prefix: &str) -> HashMap<String, String> {
    let mut config = HashMap::new();

    for (key, value) in std::env::vars() {
        if let Some(key_name) = key.strip_prefix(prefix) {
            config.insert(key_name.to_lowercase(), value);
        }
    }

    config
}

/// Fetch a setting that must be present and non-empty.
///
/// # Errors
///
/// Returns an `InvalidInput` error if the setting is missing or empty
pub fn required_setting(settings: &HashMap<String, String>, name: &str) -> CloudResult<String> {
    match settings.get(name) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Missing required setting '{name}'"),
        )),
    }
}

/// Parse an optional setting, falling back to `default` when absent.
///
/// # Errors
///
/// Returns an `InvalidInput` error if the setting is present but does not parse
pub fn parse_setting<T>(
    settings: &HashMap<String, String>,
    name: &str,
    default: T,
) -> CloudResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    settings.get(name).map_or(Ok(default), |raw| {
        raw.trim().parse::<T>().map_err(|e: T::Err| {
            CloudIOError::new(
                ErrorKind::InvalidInput,
                format!("Invalid value for setting '{name}': {raw}"),
            )
            .with_source(e.to_string())
        })
    })
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate a resource name according to common cloud provider rules
///
/// # Errors
///
/// Returns an error if:
/// - The resource name is empty
/// - The resource name exceeds 255 characters
/// - The resource name contains invalid characters (only alphanumeric, hyphens, underscores, and periods are allowed)
pub fn validate_resource_name(name: &str) -> CloudResult<()> {
    if name.is_empty() {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Resource name cannot be empty",
        ));
    }

    if name.len() > 255 {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            "Resource name too long (max 255 characters)",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CloudIOError::new(
            ErrorKind::InvalidInput,
            format!("Resource name '{name}' contains invalid characters"),
        ));
    }

    Ok(())
}
