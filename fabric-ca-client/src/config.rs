use fabric_sdk::{constants::properties, network_config::CaInfo};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use url::{Position, Url};

use crate::{FabricCaClientError, Result};

/// Lowest status code that is always treated as a hard failure.
pub const DEFAULT_STATUS_CODE_THRESHOLD: u16 = 400;

/// Trusted roots for talking to an `https` CA server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// Inline PEM bundle.
    pub pem: Option<String>,
    /// PEM files whose certificates are all trusted.
    pub pem_files: Vec<PathBuf>,
    pub allow_all_host_names: bool,
}

/// Client configuration with all fields ready to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Scheme, host and port of the server. Never ends with `/`.
    base_url: String,
    is_tls: bool,
    pub ca_name: Option<String>,
    pub tls: TlsSettings,
    status_code_threshold: u16,
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Validate `url` and build a configuration with default settings.
    ///
    /// The url must be `http` or `https`, name a host, and carry neither a
    /// path nor a query. An explicitly given CA name must not be empty.
    pub fn new(url: &str, ca_name: Option<String>) -> Result<Self> {
        if matches!(ca_name.as_deref(), Some("")) {
            return Err(FabricCaClientError::InvalidArgument(
                "name must not be an empty string.".to_string(),
            ));
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(url::ParseError::EmptyHost) => {
                return Err(FabricCaClientError::InvalidArgument(
                    "Fabric CA client url needs host".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(FabricCaClientError::InvalidArgument(format!(
                "Fabric CA client only supports http or https not {scheme}"
            )));
        }
        if parsed.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(FabricCaClientError::InvalidArgument(
                "Fabric CA client url needs host".to_string(),
            ));
        }
        let path = parsed.path();
        if !path.is_empty() && path != "/" {
            return Err(FabricCaClientError::InvalidArgument(format!(
                "Fabric CA client url does not support path portion in url remove path: '{path}'."
            )));
        }
        if let Some(query) = parsed.query() {
            return Err(FabricCaClientError::InvalidArgument(format!(
                "Fabric CA client url does not support query portion in url remove query: '?{query}'."
            )));
        }

        Ok(Self {
            base_url: parsed[..Position::AfterPort].to_string(),
            is_tls: scheme == "https",
            ca_name,
            tls: TlsSettings::default(),
            status_code_threshold: DEFAULT_STATUS_CODE_THRESHOLD,
            request_timeout: None,
        })
    }

    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_string = std::fs::read_to_string(&config_path)?;
        let config_file = ConfigFile::from_str(&config_string)?;
        Self::from_config_file(config_file)
    }

    pub fn from_config_file(config: ConfigFile) -> Result<Self> {
        let mut result = Self::new(&config.url, config.ca_name)?;
        if let Some(tls) = config.tls {
            result.tls = TlsSettings {
                pem: tls.pem,
                pem_files: tls.pem_files,
                allow_all_host_names: tls.allow_all_host_names,
            };
        }
        if let Some(threshold) = config.status_code_threshold {
            result.set_status_code_threshold(threshold);
        }
        result.request_timeout = config.request_timeout;
        Ok(result)
    }

    /// Configuration for a certificate authority entry of a network
    /// configuration. `pemFile` may list several files separated by commas.
    pub fn from_ca_info(ca_info: &CaInfo) -> Result<Self> {
        let mut config = Self::new(&ca_info.url, ca_info.ca_name.clone())?;
        let props = &ca_info.properties;

        config.tls.pem = props.get(properties::PEM_BYTES).cloned();
        config.tls.pem_files = props
            .get(properties::PEM_FILE)
            .map(|files| {
                files
                    .split(',')
                    .map(str::trim)
                    .filter(|file| !file.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();
        config.tls.allow_all_host_names = props
            .get(properties::ALLOW_ALL_HOST_NAMES)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    /// Responses with a status at or above this value are errors. Responses
    /// in `[400, threshold)` are logged and reported by status only.
    pub fn status_code_threshold(&self) -> u16 {
        self.status_code_threshold
    }

    /// Values below 400 are raised to 400.
    pub fn set_status_code_threshold(&mut self, threshold: u16) {
        self.status_code_threshold = threshold.max(DEFAULT_STATUS_CODE_THRESHOLD);
    }
}

/// Client configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
#[non_exhaustive]
pub struct ConfigFile {
    pub url: String,
    pub ca_name: Option<String>,
    pub tls: Option<TlsConfigFile>,
    pub status_code_threshold: Option<u16>,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
#[non_exhaustive]
pub struct TlsConfigFile {
    #[serde(default)]
    pub pem_files: Vec<PathBuf>,
    pub pem: Option<String>,
    #[serde(default)]
    pub allow_all_host_names: bool,
}

impl FromStr for ConfigFile {
    type Err = FabricCaClientError;

    fn from_str(config_string: &str) -> std::result::Result<Self, Self::Err> {
        Ok(toml::from_str(config_string)?)
    }
}
