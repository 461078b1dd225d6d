//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// How client assets are delivered alongside the game server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetMode {
    /// Serve the built client bundle from `static_dir`
    Static,
    /// An external dev server hosts the client; allow it through CORS
    Development,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Static vs development asset serving
    pub asset_mode: AssetMode,
    /// Built client bundle location (static mode only)
    pub static_dir: PathBuf,
    /// Allowed client origin(s) for CORS in development mode
    pub client_origin: String,

    /// Optional cap on live force fields per player
    pub max_force_fields_per_player: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let asset_mode = match lookup("APP_ENV").as_deref() {
            Some("production") => AssetMode::Static,
            _ => AssetMode::Development,
        };

        let max_force_fields_per_player = lookup("MAX_FORCE_FIELDS_PER_PLAYER")
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::Invalid("MAX_FORCE_FIELDS_PER_PLAYER"))
            })
            .transpose()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            asset_mode,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("dist")),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            max_force_fields_per_player,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_development_on_port_3000() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.asset_mode, AssetMode::Development);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_force_fields_per_player, None);
    }

    #[test]
    fn port_takes_precedence_over_server_addr() {
        let config = load(&[("PORT", "9001"), ("SERVER_ADDR", "127.0.0.1:4000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9001);
    }

    #[test]
    fn production_selects_static_assets() {
        let config = load(&[("APP_ENV", "production"), ("STATIC_DIR", "public")]).unwrap();
        assert_eq!(config.asset_mode, AssetMode::Static);
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("SERVER_ADDR", "not an address")]),
            Err(ConfigError::InvalidAddress)
        ));
        assert!(matches!(
            load(&[("MAX_FORCE_FIELDS_PER_PLAYER", "lots")]),
            Err(ConfigError::Invalid("MAX_FORCE_FIELDS_PER_PLAYER"))
        ));
        let capped = load(&[("MAX_FORCE_FIELDS_PER_PLAYER", "3")]).unwrap();
        assert_eq!(capped.max_force_fields_per_player, Some(3));
    }
}
