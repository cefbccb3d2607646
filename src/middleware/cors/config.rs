//! File-based CORS configuration.
//!
//! Services usually keep CORS settings next to the rest of their
//! configuration. The document uses the same field names as the options
//! (`camelCase`) and can be YAML or JSON:
//!
//! ```yaml
//! origin:
//!   - https://app.example.com
//!   - regex: '\.example\.com$'
//! methods: [GET, POST]
//! credentials: true
//! maxAge: 600
//! ```
//!
//! The path can also come from the `BRRTR_CORS_CONFIG` environment variable.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{compile_pattern, validate_status};
use super::{
    AllowedOrigin, CorsConfigError, CorsMiddleware, CorsOverrides, CorsSetting, HeaderList,
    MaxAge, OriginMatcher, OriginPolicy,
};

/// Environment variable naming a CORS configuration file
pub const CORS_CONFIG_ENV: &str = "BRRTR_CORS_CONFIG";

/// One element of an origin list in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginEntryConfig {
    Exact(String),
    Pattern { regex: String },
    List(Vec<OriginEntryConfig>),
}

/// The `origin` field of a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginConfig {
    /// `true` reflects the request origin, `false` sends `*`
    Flag(bool),
    /// A fixed origin (or `*`)
    Literal(String),
    /// A single pattern
    Pattern { regex: String },
    /// Any entry may match
    List(Vec<OriginEntryConfig>),
}

/// Serialized CORS configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CorsFileConfig {
    /// `false` turns CORS processing off
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Reflect any origin with credentials; other fields are ignored
    #[serde(default)]
    pub permissive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<HeaderList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<HeaderList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_headers: Option<HeaderList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<MaxAge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight_continue: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_success_status: Option<u16>,
}

fn default_enabled() -> bool {
    true
}

impl Default for CorsFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            permissive: false,
            origin: None,
            methods: None,
            allowed_headers: None,
            exposed_headers: None,
            credentials: None,
            max_age: None,
            preflight_continue: None,
            options_success_status: None,
        }
    }
}

impl CorsFileConfig {
    /// Parse a YAML document
    ///
    /// # Errors
    ///
    /// `CorsConfigError::Parse` for malformed YAML or unknown keys.
    pub fn from_yaml_str(s: &str) -> Result<Self, CorsConfigError> {
        serde_yaml::from_str(s).map_err(|e| CorsConfigError::Parse {
            format: "yaml",
            message: e.to_string(),
        })
    }

    /// Parse a JSON document
    ///
    /// # Errors
    ///
    /// `CorsConfigError::Parse` for malformed JSON or unknown keys.
    pub fn from_json_str(s: &str) -> Result<Self, CorsConfigError> {
        serde_json::from_str(s).map_err(|e| CorsConfigError::Parse {
            format: "json",
            message: e.to_string(),
        })
    }

    /// Load a file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CorsConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CorsConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        debug!(path = %path.display(), json = is_json, "Loading CORS configuration");
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Load the file named by `BRRTR_CORS_CONFIG`, if set
    ///
    /// An unset or blank variable yields `Ok(None)`.
    pub fn from_env() -> Result<Option<Self>, CorsConfigError> {
        match env::var(CORS_CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                info!(path = %path, "CORS configuration from {}", CORS_CONFIG_ENV);
                Self::from_path(path.trim()).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Convert to the top-level setting, compiling patterns and validating the status
    pub fn to_setting(&self) -> Result<CorsSetting, CorsConfigError> {
        if !self.enabled {
            return Ok(CorsSetting::Disabled);
        }
        if self.permissive {
            return Ok(CorsSetting::Permissive);
        }
        Ok(CorsSetting::Custom(self.to_overrides()?))
    }

    /// The overrides this document describes, ignoring `enabled` and `permissive`
    ///
    /// # Errors
    ///
    /// - `CorsConfigError::InvalidPattern` if an origin `regex` does not compile
    /// - `CorsConfigError::InvalidStatus` if `optionsSuccessStatus` is not a valid status
    pub fn to_overrides(&self) -> Result<CorsOverrides, CorsConfigError> {
        let origin = self
            .origin
            .as_ref()
            .map(|o| o.to_allowed_origin().map(OriginPolicy::Allowed))
            .transpose()?;
        let options_success_status = self
            .options_success_status
            .map(validate_status)
            .transpose()?;

        Ok(CorsOverrides {
            origin,
            methods: self.methods.clone(),
            allowed_headers: self.allowed_headers.clone(),
            exposed_headers: self.exposed_headers.clone(),
            credentials: self.credentials,
            max_age: self.max_age.clone(),
            preflight_continue: self.preflight_continue,
            options_success_status,
        })
    }

    /// Build the middleware this document describes
    pub fn into_middleware(self) -> Result<CorsMiddleware, CorsConfigError> {
        self.to_setting().map(CorsMiddleware::from_setting)
    }
}

impl OriginConfig {
    fn to_allowed_origin(&self) -> Result<AllowedOrigin, CorsConfigError> {
        Ok(match self {
            OriginConfig::Flag(flag) => AllowedOrigin::from(*flag),
            OriginConfig::Literal(origin) => AllowedOrigin::Fixed(origin.clone()),
            OriginConfig::Pattern { regex } => AllowedOrigin::Pattern(compile_pattern(regex)?),
            OriginConfig::List(entries) => AllowedOrigin::List(
                entries
                    .iter()
                    .map(OriginEntryConfig::to_matcher)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

impl OriginEntryConfig {
    fn to_matcher(&self) -> Result<OriginMatcher, CorsConfigError> {
        Ok(match self {
            OriginEntryConfig::Exact(origin) => OriginMatcher::Exact(origin.clone()),
            OriginEntryConfig::Pattern { regex } => OriginMatcher::Pattern(compile_pattern(regex)?),
            OriginEntryConfig::List(entries) => OriginMatcher::List(
                entries
                    .iter()
                    .map(OriginEntryConfig::to_matcher)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}
