//! Process-wide configuration.
//!
//! Settings are installed once during startup and only read afterwards.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{CaseConvention, ID_FIELD};

/// Environment variable selecting the key convention.
pub const FORMAT_KEYS_ENV: &str = "JSON_API_FORMAT_KEYS";

/// Environment variable naming the self-link field.
pub const URL_FIELD_NAME_ENV: &str = "JSON_API_URL_FIELD_NAME";

/// Default name of the self-link field.
pub const DEFAULT_URL_FIELD_NAME: &str = "url";

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Document shaping settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Convention for attribute, relationship and type names on the wire.
    pub format_keys: CaseConvention,
    /// Field rendered as `links.self`; never removed by sparse fieldsets.
    pub url_field_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format_keys: CaseConvention::default(),
            url_field_name: DEFAULT_URL_FIELD_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_keys(mut self, convention: CaseConvention) -> Self {
        self.format_keys = convention;
        self
    }

    pub fn url_field_name(mut self, name: impl Into<String>) -> Self {
        self.url_field_name = name.into();
        self
    }

    /// Read settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(value) = lookup(FORMAT_KEYS_ENV) {
            settings.format_keys = parse_convention(&value)?;
        }
        if let Some(value) = lookup(URL_FIELD_NAME_ENV).filter(|v| !v.trim().is_empty()) {
            settings.url_field_name = value.trim().to_string();
        }
        Ok(settings)
    }

    /// Fields kept regardless of sparse fieldset directives.
    pub fn protected_fields(&self) -> BTreeSet<String> {
        [ID_FIELD.to_string(), self.url_field_name.clone()]
            .into_iter()
            .collect()
    }
}

/// Parse a convention setting value.
pub fn parse_convention(value: &str) -> Result<CaseConvention, ConfigError> {
    CaseConvention::parse(value).ok_or_else(|| ConfigError::UnknownConvention {
        value: value.to_string(),
    })
}

/// Install the process-wide settings. Call once, before serving requests.
///
/// # Errors
///
/// `ConfigError::AlreadyInstalled` on a second call.
pub fn install(settings: Settings) -> Result<&'static Settings, ConfigError> {
    install_into(&SETTINGS, settings)
}

/// The installed settings, or the defaults when none were installed.
///
/// Once this has run, `install` fails.
pub fn current() -> &'static Settings {
    current_in(&SETTINGS)
}

fn install_into(cell: &OnceLock<Settings>, settings: Settings) -> Result<&Settings, ConfigError> {
    cell.set(settings)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    Ok(current_in(cell))
}

fn current_in(cell: &OnceLock<Settings>) -> &Settings {
    cell.get_or_init(Settings::default)
}
