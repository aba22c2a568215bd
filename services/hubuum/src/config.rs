use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
const DEFAULT_TOKEN_TTL_SECONDS: u64 = 86_400;
const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

// Hubuum service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct HubuumConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub token_ttl_seconds: u64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_pg_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_pg_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

/// Superuser seeded at startup when both username and password are set.
#[derive(Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct HubuumConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    token_ttl_seconds: Option<u64>,
    bootstrap_admin: Option<BootstrapAdmin>,
}

fn default_pg_max_connections() -> u32 {
    DEFAULT_PG_MAX_CONNECTIONS
}

fn default_pg_connect_timeout_ms() -> u64 {
    DEFAULT_PG_CONNECT_TIMEOUT_MS
}

fn default_pg_acquire_timeout_ms() -> u64 {
    DEFAULT_PG_ACQUIRE_TIMEOUT_MS
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}

impl HubuumConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("HUBUUM_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse HUBUUM_BIND")?;
        let metrics_bind = std::env::var("HUBUUM_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse HUBUUM_METRICS_BIND")?;
        let storage = std::env::var("HUBUUM_STORAGE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()
            .with_context(|| "parse HUBUUM_STORAGE")?;
        let postgres = match std::env::var("HUBUUM_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse(
                    "HUBUUM_POSTGRES_MAX_CONNECTIONS",
                    DEFAULT_PG_MAX_CONNECTIONS,
                )?,
                connect_timeout_ms: env_parse(
                    "HUBUUM_POSTGRES_CONNECT_TIMEOUT_MS",
                    DEFAULT_PG_CONNECT_TIMEOUT_MS,
                )?,
                acquire_timeout_ms: env_parse(
                    "HUBUUM_POSTGRES_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_PG_ACQUIRE_TIMEOUT_MS,
                )?,
            }),
            Err(_) => None,
        };
        let token_ttl_seconds = env_parse("HUBUUM_TOKEN_TTL_SECONDS", DEFAULT_TOKEN_TTL_SECONDS)?;
        let bootstrap_admin = match (
            std::env::var("HUBUUM_BOOTSTRAP_ADMIN_USERNAME"),
            std::env::var("HUBUUM_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => Some(BootstrapAdmin { username, password }),
            _ => None,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            token_ttl_seconds,
            bootstrap_admin,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("HUBUUM_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read HUBUUM_CONFIG: {path}"))?;
            let override_cfg: HubuumConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse hubuum config yaml")?;
            config.apply(override_cfg)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: HubuumConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.token_ttl_seconds {
            self.token_ttl_seconds = value;
        }
        if let Some(value) = override_cfg.bootstrap_admin {
            self.bootstrap_admin = Some(value);
        }
        Ok(())
    }
}
