// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML configuration for the uplink.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed service URL '{url}': {reason}")]
    ServiceUrl { url: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level uplink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkConfig {
    /// Base URL of the SensorThings service.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Post observations through the DataArray extension.
    ///
    /// Observations are grouped per stream until the next flush.
    #[serde(default)]
    pub use_data_arrays: bool,

    /// Validate and batch, but never send anything.
    #[serde(default)]
    pub dry_run: bool,

    /// Credentials handed to the service client.
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Pub/sub connection settings.
    #[serde(default)]
    pub mqtt: MqttConfig,
}

/// Authentication method for the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// Pub/sub broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker URL (e.g. `tcp://localhost:1883`).
    #[serde(default = "default_mqtt_url")]
    pub url: String,

    /// Client identity. Empty or absent means a random one is generated.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_service_url() -> String {
    "http://localhost:8080/FROST-Server/v1.0".to_string()
}

fn default_mqtt_url() -> String {
    "tcp://localhost:1883".to_string()
}

impl MqttConfig {
    /// Configured client identity, if one is set and not blank.
    pub fn fixed_client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            url: default_mqtt_url(),
            client_id: None,
        }
    }
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            use_data_arrays: false,
            dry_run: false,
            auth: None,
            mqtt: MqttConfig::default(),
        }
    }
}

impl UplinkConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: UplinkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_endpoint()?;

        if self.mqtt.url.trim().is_empty() {
            return Err(ConfigError::Invalid("MQTT URL is empty".into()));
        }

        if let Some(AuthConfig::Basic { username, .. }) = &self.auth {
            if username.is_empty() {
                return Err(ConfigError::Invalid(
                    "Basic authentication needs a username".into(),
                ));
            }
        }

        Ok(())
    }

    /// Parse the service URL.
    pub fn service_endpoint(&self) -> Result<Url, ConfigError> {
        let malformed = |reason: String| ConfigError::ServiceUrl {
            url: self.service_url.clone(),
            reason,
        };

        let url = Url::parse(self.service_url.trim()).map_err(|e| malformed(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(malformed(format!("unsupported scheme '{}'", other))),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(malformed("missing host".into()));
        }
        Ok(url)
    }
}
