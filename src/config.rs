//! Runtime configuration from environment variables.
//!
//! | Variable                     | Default          | Meaning                               |
//! |------------------------------|------------------|---------------------------------------|
//! | `HEARTLINE_MODEL_PATH`       | `models`         | model file or directory               |
//! | `HEARTLINE_REQUIRE_MANIFEST` | `false`          | refuse models without `manifest.json` |
//! | `HEARTLINE_LOG_MODE`         | `auto`           | `auto`, `file` or `stdout`            |
//! | `HEARTLINE_LOG_FILE`         | `heartline.log`  | log path when logging to a file       |

use std::path::PathBuf;

use crate::adapters::model::LoadOptions;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise
    Auto,
    File,
    Stdout,
}

/// Error for malformed configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub require_manifest: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models"),
            require_manifest: false,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from("heartline.log"),
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key,
            value: other.to_string(),
            expected: "true or false",
        }),
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is set to an unrecognized value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is set to an unrecognized value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup("HEARTLINE_MODEL_PATH").filter(|v| !v.is_empty()) {
            settings.model_path = PathBuf::from(path);
        }

        if let Some(v) = lookup("HEARTLINE_REQUIRE_MANIFEST") {
            settings.require_manifest = parse_bool("HEARTLINE_REQUIRE_MANIFEST", &v)?;
        }

        if let Some(v) = lookup("HEARTLINE_LOG_MODE") {
            settings.log_mode = match v.trim() {
                "" | "auto" => LogMode::Auto,
                "file" => LogMode::File,
                "stdout" => LogMode::Stdout,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "HEARTLINE_LOG_MODE",
                        value: other.to_string(),
                        expected: "auto, file or stdout",
                    })
                }
            };
        }

        if let Some(path) = lookup("HEARTLINE_LOG_FILE").filter(|v| !v.is_empty()) {
            settings.log_file = PathBuf::from(path);
        }

        Ok(settings)
    }

    /// Loader options derived from these settings.
    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_manifest: self.require_manifest,
        }
    }

    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn log_to_file(&self, interactive: bool) -> bool {
        match self.log_mode {
            LogMode::File => true,
            LogMode::Stdout => false,
            LogMode::Auto => interactive,
        }
    }
}
