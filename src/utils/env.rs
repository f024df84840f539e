/// Get environment variable with PIMSYNC_ prefix, falling back to unprefixed version
///
/// This helper function checks for `PIMSYNC_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust
/// use pimsync::utils::get_env_with_prefix;
///
/// // Checks PIMSYNC_SYNC_MAX_RETRIES first, then SYNC_MAX_RETRIES
/// let retries = get_env_with_prefix("SYNC_MAX_RETRIES");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("PIMSYNC_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}
