// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output configuration.
//!
//! Supports programmatic, file-based and plugin-property configuration.

use crate::accessor::{validate_template, TemplateError};
use crate::routing_key::{RoutingKey, RoutingKeyError, DEFAULT_DELIMITER};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid routing key template: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output name (for identification).
    #[serde(default = "default_output_name")]
    pub name: String,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Broker connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Exchange the records are published to.
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Routing key settings.
    pub routing_key: RoutingKeyConfig,
}

fn default_output_name() -> String {
    "rkey-router".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5672
}

fn default_exchange_kind() -> String {
    "topic".to_string()
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

impl OutputConfig {
    /// Create a configuration publishing to `exchange` with the given template.
    pub fn new(exchange: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: default_output_name(),
            log_level: default_log_level(),
            broker: BrokerConfig::default(),
            exchange: ExchangeConfig {
                name: exchange.into(),
                kind: default_exchange_kind(),
            },
            routing_key: RoutingKeyConfig::new(template),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without applying defaults or validating.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Build configuration from the flat key/value properties handed over by
    /// the host runtime (`RabbitHost`, `RoutingKey`, ...).
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored.
    pub fn from_properties<'a, I>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::new("", "");

        for (key, value) in properties {
            match key.to_ascii_lowercase().as_str() {
                "rabbithost" => config.broker.host = value.to_string(),
                "rabbitport" => {
                    config.broker.port = value.trim().parse().map_err(|_| {
                        ConfigError::Invalid(format!("RabbitPort '{}' is not a valid port", value))
                    })?;
                }
                "rabbituser" => config.broker.user = value.to_string(),
                "rabbitpassword" => config.broker.password = value.to_string(),
                "topicname" => config.exchange.name = value.to_string(),
                "topictype" => config.exchange.kind = value.to_string(),
                "routingkey" => config.routing_key.template = value.to_string(),
                "routingkeydelimiter" => config.routing_key.delimiter = value.to_string(),
                "removerkvaluesfromrecord" => {
                    config.routing_key.consume = parse_bool(value).ok_or_else(|| {
                        ConfigError::Invalid(format!(
                            "RemoveRkValuesFromRecord '{}' is not a boolean",
                            value
                        ))
                    })?;
                }
                "loglevel" => config.log_level = value.to_string(),
                other => tracing::debug!(key = other, "Ignoring unknown property"),
            }
        }

        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Fill in values that are present but empty.
    pub fn apply_defaults(&mut self) {
        if self.routing_key.delimiter.is_empty() {
            self.routing_key.delimiter = default_delimiter();
            tracing::info!(
                delimiter = %self.routing_key.delimiter,
                "Routing key delimiter not set, using default"
            );
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing_key.delimiter.is_empty() {
            return Err(ConfigError::Invalid("Routing key delimiter is empty".into()));
        }

        validate_template(&self.routing_key.template, &self.routing_key.delimiter)?;

        Ok(())
    }

    /// Compile the routing key.
    pub fn compile_routing_key(&self) -> Result<RoutingKey, RoutingKeyError> {
        let key = RoutingKey::new(&self.routing_key.template, &self.routing_key.delimiter)?;
        Ok(key.consume(self.routing_key.consume))
    }

    /// Set the routing key delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.routing_key.delimiter = delimiter.into();
        self
    }

    /// Enable or disable removal of routing-key values from published records.
    pub fn consume(mut self, enabled: bool) -> Self {
        self.routing_key.consume = enabled;
        self
    }

    /// Set the broker endpoint.
    pub fn broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.broker.host = host.into();
        self.broker.port = port;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl BrokerConfig {
    /// `host:port` of the broker.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Exchange settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Exchange name.
    #[serde(default)]
    pub name: String,

    /// Exchange type (topic, direct, fanout, headers).
    #[serde(default = "default_exchange_kind")]
    pub kind: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: default_exchange_kind(),
        }
    }
}

/// Routing key settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingKeyConfig {
    /// Template mixing literal text and record accessors.
    pub template: String,

    /// Segment delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Remove values used in the routing key from the published record.
    #[serde(default)]
    pub consume: bool,
}

impl RoutingKeyConfig {
    /// Create settings with the default delimiter.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            delimiter: default_delimiter(),
            consume: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            OutputConfig::new("logs", "").validate(),
            Err(ConfigError::Template(TemplateError::EmptyTemplate))
        ));
        assert!(matches!(
            OutputConfig::new("logs", "a..b").validate(),
            Err(ConfigError::Template(TemplateError::EmptySegment { position: 1 }))
        ));
        assert!(matches!(
            OutputConfig::new("logs", "$[01]").validate(),
            Err(ConfigError::Template(TemplateError::InvalidAccessor(ref s))) if s == "$[01]"
        ));
        assert!(OutputConfig::new("logs", r#"app.$["level"]"#).validate().is_ok());
    }

    #[test]
    fn test_compile_routing_key_keeps_template_error() {
        assert_eq!(
            OutputConfig::new("logs", "a.").compile_routing_key().err(),
            Some(RoutingKeyError::Template(TemplateError::EmptySegment { position: 1 }))
        );
    }

    #[test]
    fn test_delimiter_changes_validation() {
        let config = OutputConfig::new("logs", r#"$["a.b"]"#);
        assert!(config.validate().is_err());
        assert!(config.delimiter("|").validate().is_ok());
    }

    #[test]
    fn test_empty_delimiter_defaults() {
        let mut config = OutputConfig::new("logs", r#"$["a"].x"#).delimiter("");
        assert!(config.validate().is_err());
        config.apply_defaults();
        assert_eq!(config.routing_key.delimiter, ".");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compile_routing_key() {
        let key = OutputConfig::new("logs", r#"$["a"]"#)
            .consume(true)
            .compile_routing_key()
            .expect("compile");
        assert!(key.is_consuming());
        assert_eq!(key.template(), r#"$["a"]"#);
    }

    #[test]
    fn test_from_properties() {
        let config = OutputConfig::from_properties([
            ("RabbitHost", "mq.internal"),
            ("RabbitPort", "5673"),
            ("RabbitUser", "fluent"),
            ("RabbitPassword", "secret"),
            ("TopicName", "logs"),
            ("TopicType", "direct"),
            ("RoutingKey", r#"$["kubernetes"]["namespace"].app"#),
            ("RoutingKeyDelimiter", ""),
            ("RemoveRkValuesFromRecord", "true"),
            ("Match", "*"),
        ])
        .expect("valid properties");

        assert_eq!(config.broker.endpoint(), "mq.internal:5673");
        assert_eq!(config.broker.user, "fluent");
        assert_eq!(config.exchange.name, "logs");
        assert_eq!(config.exchange.kind, "direct");
        assert_eq!(config.routing_key.delimiter, ".");
        assert!(config.routing_key.consume);
    }

    #[test]
    fn test_from_properties_case_insensitive() {
        let config = OutputConfig::from_properties([
            ("routing_key", "ignored"),
            ("routingkey", "static.key"),
        ])
        .expect("valid properties");
        assert_eq!(config.routing_key.template, "static.key");
    }

    #[test]
    fn test_from_properties_rejects_bad_values() {
        assert!(OutputConfig::from_properties([("RoutingKey", "a"), ("RabbitPort", "x")]).is_err());
        assert!(OutputConfig::from_properties([
            ("RoutingKey", "a"),
            ("RemoveRkValuesFromRecord", "maybe")
        ])
        .is_err());
        assert!(OutputConfig::from_properties([("RoutingKey", r#"$["a"]."#)]).is_err());
        assert!(OutputConfig::from_properties([("TopicName", "logs")]).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
name = "k8s-logs"

[broker]
host = "rabbit"
port = 5672
user = "guest"

[exchange]
name = "logs"

[routing_key]
template = '$["kubernetes"]["namespace_name"].$["level"]'
consume = true
"#
        )
        .expect("write config");

        let config = OutputConfig::from_file(file.path()).expect("load config");
        assert_eq!(config.name, "k8s-logs");
        assert_eq!(config.exchange.kind, "topic");
        assert_eq!(config.routing_key.delimiter, ".");
        assert!(config.routing_key.consume);
    }

    #[test]
    fn test_read_file_leaves_defaults_to_caller() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[routing_key]
template = 'a.b'
delimiter = ""
"#
        )
        .expect("write config");

        let mut config = OutputConfig::read_file(file.path()).expect("parse config");
        assert_eq!(config.routing_key.delimiter, "");
        config.apply_defaults();
        assert_eq!(config.routing_key.delimiter, ".");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_invalid_template() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[routing_key]
template = '$["a b"]'
"#
        )
        .expect("write config");

        assert!(matches!(
            OutputConfig::from_file(file.path()),
            Err(ConfigError::Template(TemplateError::InvalidAccessor(_)))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = OutputConfig::new("logs", r#"$["tag"]"#);
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        assert!(toml_str.contains("[routing_key]"));
        assert!(toml_str.contains("delimiter = \".\""));
        assert!(!toml_str.contains("password"));
    }
}
