//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate tag table and exporter settings
//! - Generate `LoggerBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("logger.toml")).unwrap();
//! println!("Logger: {} ({} tags)", blueprint.logger.name, blueprint.tags.len());
//! ```

mod parser;
mod validator;

pub use contracts::LoggerBlueprint;
pub use parser::ConfigFormat;

use contracts::{ContractError, HttpAuth};
use std::path::Path;

/// Environment variables that override HTTP exporter credentials
///
/// Lets deployments keep secrets out of the config file.
pub const ENV_HTTP_USERNAME: &str = "TAG_LOGGER_HTTP_USERNAME";
pub const ENV_HTTP_PASSWORD: &str = "TAG_LOGGER_HTTP_PASSWORD";
pub const ENV_HTTP_TOKEN: &str = "TAG_LOGGER_HTTP_TOKEN";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is picked from the extension (.toml / .json); credential
    /// overrides from the process environment are applied before validation.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<LoggerBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let mut blueprint = parser::parse(&content, format)?;
        apply_credential_overrides(&mut blueprint, |key| std::env::var(key).ok());
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load configuration from string, without environment overrides
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoggerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Serialize LoggerBlueprint to JSON string
    pub fn to_json(blueprint: &LoggerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

/// Overlay HTTP credentials looked up through `lookup`
///
/// A token switches auth to bearer; a username or password switches it to
/// basic, keeping whichever half the file already provides.
pub fn apply_credential_overrides<F>(blueprint: &mut LoggerBlueprint, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let auth = &mut blueprint.exporters.http.auth;

    if let Some(token) = lookup(ENV_HTTP_TOKEN) {
        *auth = HttpAuth::Bearer { token };
        return;
    }

    let username = lookup(ENV_HTTP_USERNAME);
    let password = lookup(ENV_HTTP_PASSWORD);
    if username.is_none() && password.is_none() {
        return;
    }

    let (file_user, file_pass) = match auth {
        HttpAuth::Basic { username, password } => (username.clone(), password.clone()),
        _ => (String::new(), String::new()),
    };
    *auth = HttpAuth::Basic {
        username: username.unwrap_or(file_user),
        password: password.unwrap_or(file_pass),
    };
}
