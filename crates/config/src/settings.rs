// Pipeline settings
// Loaded from ~/.config/duodata/settings.toml, every field optional

use std::fs;
use std::path::{Path, PathBuf};

use duodata_io::{DecodeOptions, NumberFormat};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Separators used by the published delimited files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberFormatSettings {
    /// `None` disables thousands grouping.
    pub thousands: Option<char>,
    pub decimal: char,
}

impl Default for NumberFormatSettings {
    fn default() -> Self {
        Self {
            thousands: Some('.'),
            decimal: ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix for relative download links found on listing pages
    pub host_root: String,

    /// Encoding label of the delimited files (WHATWG label, e.g. "windows-1252")
    pub codepage: String,

    pub delimiter: char,

    /// Cell value meaning "suppressed for privacy"
    pub redaction_marker: String,

    pub number_format: NumberFormatSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_root: "http://duo.nl".to_string(),
            codepage: "windows-1252".to_string(),
            delimiter: ';',
            redaction_marker: "*".to_string(),
            number_format: NumberFormatSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duodata");
        config_dir.join("settings.toml")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    /// Load an explicitly named file, or the default path when it exists,
    /// falling back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let path = Self::default_path();
        if path.exists() {
            log::debug!("loading settings from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Encoding::for_label(self.codepage.as_bytes()).is_none() {
            return Err(ConfigError::Validation(format!(
                "unknown codepage '{}'",
                self.codepage
            )));
        }

        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(ConfigError::Validation(format!(
                "delimiter must be a single ASCII character other than quote or newline, got {:?}",
                self.delimiter
            )));
        }

        let nf = &self.number_format;
        if nf.thousands == Some(nf.decimal) {
            return Err(ConfigError::Validation(format!(
                "thousands and decimal separators are both '{}'",
                nf.decimal
            )));
        }

        if self.redaction_marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "redaction_marker must not be blank".into(),
            ));
        }

        if !(self.host_root.starts_with("http://") || self.host_root.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "host_root must be an http(s) URL, got '{}'",
                self.host_root
            )));
        }

        Ok(())
    }

    pub fn number_format(&self) -> NumberFormat {
        NumberFormat {
            thousands: self.number_format.thousands,
            decimal: self.number_format.decimal,
        }
    }

    pub fn decode_options(&self) -> Result<DecodeOptions, ConfigError> {
        let codepage = Encoding::for_label(self.codepage.as_bytes()).ok_or_else(|| {
            ConfigError::Validation(format!("unknown codepage '{}'", self.codepage))
        })?;
        let delimiter = u8::try_from(self.delimiter).map_err(|_| {
            ConfigError::Validation(format!("delimiter {:?} is not a single byte", self.delimiter))
        })?;

        Ok(DecodeOptions {
            codepage,
            delimiter,
            number_format: self.number_format(),
        })
    }
}
