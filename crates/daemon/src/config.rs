// Daemon Configuration - read once from the environment

use anyhow::{bail, Context, Result};
use std::time::Duration;
use waitline_core::application::events::DEFAULT_EVENT_CAPACITY;

const DEFAULT_DB_PATH: &str = "~/.waitline/queues.db";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9640;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;

/// Where queue state lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite { db_path: String },
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub store: StoreKind,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub lock_timeout: Duration,
    pub require_host_token: bool,
    pub event_capacity: usize,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = match lookup("WAITLINE_STORE").as_deref() {
            None | Some("sqlite") => {
                let db_path = lookup("WAITLINE_DB_PATH")
                    .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
                StoreKind::Sqlite {
                    db_path: shellexpand::tilde(&db_path).into_owned(),
                }
            }
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("WAITLINE_STORE must be sqlite or memory, got {}", other),
        };

        let log_format = match lookup("WAITLINE_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let rpc_port = match lookup("WAITLINE_RPC_PORT") {
            Some(raw) => raw.parse().context("WAITLINE_RPC_PORT must be a port number")?,
            None => DEFAULT_RPC_PORT,
        };

        let lock_timeout_ms = match lookup("WAITLINE_LOCK_TIMEOUT_MS") {
            Some(raw) => raw
                .parse()
                .context("WAITLINE_LOCK_TIMEOUT_MS must be milliseconds")?,
            None => DEFAULT_LOCK_TIMEOUT_MS,
        };

        let require_host_token = match lookup("WAITLINE_REQUIRE_HOST_TOKEN").as_deref() {
            None => true,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => bail!("WAITLINE_REQUIRE_HOST_TOKEN must be a boolean, got {}", other),
        };

        let event_capacity = match lookup("WAITLINE_EVENT_CAPACITY") {
            Some(raw) => raw
                .parse()
                .context("WAITLINE_EVENT_CAPACITY must be a positive integer")?,
            None => DEFAULT_EVENT_CAPACITY,
        };

        Ok(Self {
            store,
            rpc_host: lookup("WAITLINE_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            require_host_token,
            event_capacity,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert!(matches!(config.store, StoreKind::Sqlite { ref db_path } if db_path.ends_with("queues.db")));
        assert_eq!(config.rpc_host, "127.0.0.1");
        assert_eq!(config.rpc_port, 9640);
        assert_eq!(config.lock_timeout, Duration::from_millis(2000));
        assert!(config.require_host_token);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("WAITLINE_STORE", "memory"),
            ("WAITLINE_RPC_PORT", "7000"),
            ("WAITLINE_LOCK_TIMEOUT_MS", "250"),
            ("WAITLINE_REQUIRE_HOST_TOKEN", "false"),
            ("WAITLINE_LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.rpc_port, 7000);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert!(!config.require_host_token);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config(&[("WAITLINE_STORE", "postgres")]).is_err());
        assert!(config(&[("WAITLINE_RPC_PORT", "not-a-port")]).is_err());
        assert!(config(&[("WAITLINE_REQUIRE_HOST_TOKEN", "maybe")]).is_err());
    }
}
