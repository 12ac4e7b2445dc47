//! Environment variable utilities for provider configuration.

/// Get an optional, non-empty environment variable.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the value is "1" or "true" (case-insensitive).
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse an unsigned integer environment variable, ignoring malformed values.
pub fn env_u64(key: &str) -> Option<u64> {
    let raw = env_opt(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not an unsigned integer", key, raw);
            None
        }
    }
}

/// Get an environment variable with fallback keys.
pub fn env_with_fallbacks(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env_opt(key))
}

/// Get an environment variable with fallback keys and a default value.
pub fn env_with_fallbacks_or(keys: &[&str], default: &str) -> String {
    env_with_fallbacks(keys).unwrap_or_else(|| default.to_string())
}
