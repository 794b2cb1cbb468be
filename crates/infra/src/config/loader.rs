//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Probe the standard locations for a config file (JSON or TOML)
//! 2. Fall back to the built-in defaults when none is found
//! 3. Apply environment variable overrides
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `LOOPAUTH_AUTHORIZATION_URL`: Authorization page URL
//! - `LOOPAUTH_TOKEN_URL`: Token endpoint URL
//! - `LOOPAUTH_USERINFO_URL`: Identity endpoint prefix
//! - `LOOPAUTH_LOOPBACK_PATH`: Redirect path on the loopback listener
//! - `LOOPAUTH_APPLICATION_NAME`: Name shown on the acknowledgment page
//! - `LOOPAUTH_HTTP_TIMEOUT`: Outbound request timeout in seconds
//! - `LOOPAUTH_USER_AGENT`: Outbound `User-Agent`
//!
//! ## File Locations
//! `loopauth.{toml,json}` then `config.{toml,json}` in the current directory,
//! its two parents, and the same set relative to the executable.

use std::path::{Path, PathBuf};

use loopauth_domain::{DesktopOAuthConfig, LoopauthError, Result};
use url::Url;

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] = ["loopauth.toml", "loopauth.json", "config.toml", "config.json"];
const SEARCH_DIRS: [&str; 3] = [".", "..", "../.."];

/// Load configuration from the first file found, or defaults, then apply
/// environment overrides.
///
/// # Errors
/// Returns `LoopauthError::Config` if a found file cannot be parsed, an
/// override has an invalid value, or validation fails.
pub fn load() -> Result<DesktopOAuthConfig> {
    let config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, using defaults");
            DesktopOAuthConfig::default()
        }
    };

    let config = apply_env_overrides(config)?;
    validate(&config)?;
    Ok(config)
}

/// Defaults with environment overrides applied. No file is read.
///
/// # Errors
/// Returns `LoopauthError::Config` if an override is invalid.
pub fn load_from_env() -> Result<DesktopOAuthConfig> {
    let config = apply_env_overrides(DesktopOAuthConfig::default())?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension (`.json` or `.toml`). Missing sections take their defaults.
///
/// # Errors
/// Returns `LoopauthError::Config` if the file is missing or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<DesktopOAuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LoopauthError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            LoopauthError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LoopauthError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<DesktopOAuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| LoopauthError::from(InfraError::from(e))),
        "json" => serde_json::from_str(contents).map_err(|e| LoopauthError::from(InfraError::from(e))),
        _ => Err(LoopauthError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file in the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            SEARCH_DIRS.iter().flat_map(move |dir| {
                CONFIG_FILE_NAMES.iter().map(move |name| root.join(dir).join(name))
            })
        })
        .find(|path| path.is_file())
}

/// Overlay `LOOPAUTH_*` environment variables onto `config`.
///
/// # Errors
/// Returns `LoopauthError::Config` if `LOOPAUTH_HTTP_TIMEOUT` is not a
/// number.
pub fn apply_env_overrides(mut config: DesktopOAuthConfig) -> Result<DesktopOAuthConfig> {
    if let Some(value) = env_opt("LOOPAUTH_AUTHORIZATION_URL") {
        config.endpoints.authorization_url = value;
    }
    if let Some(value) = env_opt("LOOPAUTH_TOKEN_URL") {
        config.endpoints.token_url = value;
    }
    if let Some(value) = env_opt("LOOPAUTH_USERINFO_URL") {
        config.endpoints.userinfo_url = value;
    }
    if let Some(value) = env_opt("LOOPAUTH_LOOPBACK_PATH") {
        config.loopback.path = value;
    }
    if let Some(value) = env_opt("LOOPAUTH_APPLICATION_NAME") {
        config.loopback.application_name = value;
    }
    if let Some(value) = env_opt("LOOPAUTH_HTTP_TIMEOUT") {
        config.http.timeout_seconds = value
            .parse::<u64>()
            .map_err(|e| LoopauthError::Config(format!("Invalid HTTP timeout: {}", e)))?;
    }
    if let Some(value) = env_opt("LOOPAUTH_USER_AGENT") {
        config.http.user_agent = Some(value);
    }

    Ok(config)
}

/// Check invariants the components rely on.
///
/// # Errors
/// Returns `LoopauthError::Config` naming the first offending field.
pub fn validate(config: &DesktopOAuthConfig) -> Result<()> {
    validate_endpoint("endpoints.authorization_url", &config.endpoints.authorization_url)?;
    validate_endpoint("endpoints.token_url", &config.endpoints.token_url)?;
    validate_endpoint("endpoints.userinfo_url", &config.endpoints.userinfo_url)?;

    if !config.loopback.path.starts_with('/') {
        return Err(LoopauthError::Config(format!(
            "loopback.path must start with '/': {}",
            config.loopback.path
        )));
    }

    if config.http.timeout_seconds == 0 {
        return Err(LoopauthError::Config("http.timeout_seconds must be positive".into()));
    }

    Ok(())
}

fn validate_endpoint(field: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value)
        .map_err(|e| LoopauthError::Config(format!("{field} is not a valid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(LoopauthError::Config(format!(
            "{field} must use http or https, got '{scheme}'"
        ))),
    }
}

/// Non-empty environment variable value.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
