//! Utility functions for pacer
//!
//! Provides environment-file loading and float rendering shared by the
//! journals and the daemon.

use std::path::Path;

/// Load environment variables from the pacer env file if not already set.
/// Searches standard locations in order:
/// 1. /usr/local/etc/pacer/pacer.env
/// 2. User's config directory/pacer/pacer.env
/// 3. ~/.config/pacer/pacer.env
pub fn load_env_file() {
    let env_paths = [
        "/usr/local/etc/pacer/pacer.env".to_string(),
        dirs::config_dir()
            .map(|p| p.join("pacer/pacer.env").to_string_lossy().to_string())
            .unwrap_or_default(),
        dirs::home_dir()
            .map(|p| p.join(".config/pacer/pacer.env").to_string_lossy().to_string())
            .unwrap_or_default(),
    ];

    for path in &env_paths {
        if path.is_empty() {
            continue;
        }
        if Path::new(path).exists() {
            if let Ok(contents) = std::fs::read_to_string(path) {
                parse_env_file(&contents);
            }
            break;
        }
    }
}

/// Parse env file contents and set environment variables (only if not already set).
/// Supports formats:
/// - `KEY=value`
/// - `export KEY=value`
/// - `KEY="quoted value"`
/// - `KEY='single quoted'`
/// - Comments starting with #
pub fn parse_env_file(contents: &str) {
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// Render a float in shortest round-trip form, keeping a trailing `.0` on
/// integral values so journal columns stay recognisably floating point.
///
/// # Example
/// ```
/// use pacer_core::util::fmt_float;
///
/// assert_eq!(fmt_float(1.0), "1.0");
/// assert_eq!(fmt_float(0.95), "0.95");
/// assert_eq!(fmt_float(-0.5), "-0.5");
/// ```
pub fn fmt_float(value: f64) -> String {
    format!("{value:?}")
}
