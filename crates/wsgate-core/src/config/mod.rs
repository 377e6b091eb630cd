//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files plus `WSGATE__*` environment variables. Every field
//! has a default, so an empty configuration is valid.

pub mod app;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::logging::LoggingConfig;
use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection engine settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay
    /// `config/{env}` and environment variables prefixed with `WSGATE`
    /// (e.g. `WSGATE__SERVER__PORT=9100`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WSGATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize an already merged configuration.
    pub fn from_config(config: config::Config) -> Result<Self, AppError> {
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::config::realtime::IdStrategy;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:9001");
        assert_eq!(config.realtime.outbound_buffer_size, 256);
        assert_eq!(config.realtime.id_strategy, IdStrategy::Random);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"server": {"port": 7000}, "realtime": {"id_strategy": "sequential"}}"#,
        )
        .expect("deserialize");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.realtime.id_strategy, IdStrategy::Sequential);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_from_config_applies_overrides() {
        let merged = config::Config::builder()
            .set_override("server.port", 9100)
            .expect("override")
            .build()
            .expect("build");

        let config = AppConfig::from_config(merged).expect("deserialize");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.realtime.outbound_buffer_size, 256);
    }

    #[test]
    fn test_invalid_value_keeps_config_error_source() {
        let merged = config::Config::builder()
            .set_override("server.port", "not-a-port")
            .expect("override")
            .build()
            .expect("build");

        let err = AppConfig::from_config(merged).expect_err("port must be numeric");
        assert_eq!(err.kind, ErrorKind::Configuration);
        let source = err.source().expect("config error kept as source");
        assert!(source.is::<config::ConfigError>());
    }

    #[test]
    fn test_sequential_strategy_builds_counter() {
        let ids = IdStrategy::Sequential.build();
        assert_eq!(ids.next_id().as_u128(), 1);
        assert_eq!(ids.next_id().as_u128(), 2);
    }
}
