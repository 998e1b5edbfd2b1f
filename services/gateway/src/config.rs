use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

// Gateway configuration sourced from environment variables, optionally
// overridden by a YAML file named in CDF_CONFIG.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub auth: AuthConfig,
    pub token_cleanup_interval_secs: u64,
    pub audit_retention: usize,
    pub mock_api_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
struct GatewayConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    jwt_issuer: Option<String>,
    jwt_audience: Option<String>,
    jwt_leeway_secs: Option<u64>,
    token_cleanup_interval_secs: Option<u64>,
    audit_retention: Option<usize>,
    mock_api_enabled: Option<bool>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr: SocketAddr = env_or("CDF_BIND", "0.0.0.0:8080")
            .parse()
            .with_context(|| "parse CDF_BIND")?;
        let metrics_bind: SocketAddr = env_or("CDF_METRICS_BIND", "0.0.0.0:9090")
            .parse()
            .with_context(|| "parse CDF_METRICS_BIND")?;
        let storage = env_or("CDF_STORAGE", "memory")
            .parse::<StorageBackend>()
            .with_context(|| "parse CDF_STORAGE")?;
        let postgres = match std::env::var("CDF_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_or("CDF_POSTGRES_MAX_CONNECTIONS", "10")
                    .parse()
                    .with_context(|| "parse CDF_POSTGRES_MAX_CONNECTIONS")?,
                connect_timeout_ms: env_or("CDF_POSTGRES_CONNECT_TIMEOUT_MS", "5000")
                    .parse()
                    .with_context(|| "parse CDF_POSTGRES_CONNECT_TIMEOUT_MS")?,
                acquire_timeout_ms: env_or("CDF_POSTGRES_ACQUIRE_TIMEOUT_MS", "5000")
                    .parse()
                    .with_context(|| "parse CDF_POSTGRES_ACQUIRE_TIMEOUT_MS")?,
            }),
            Err(_) => None,
        };
        let jwt_secret =
            std::env::var("CDF_JWT_SECRET").with_context(|| "CDF_JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("CDF_JWT_SECRET must not be empty");
        }
        let auth = AuthConfig {
            jwt_secret,
            issuer: env_or("CDF_JWT_ISSUER", "cdf-platform"),
            audience: env_or("CDF_JWT_AUDIENCE", "authenticated"),
            leeway_secs: env_or("CDF_JWT_LEEWAY_SECS", "5")
                .parse()
                .with_context(|| "parse CDF_JWT_LEEWAY_SECS")?,
        };
        let token_cleanup_interval_secs: u64 = env_or("CDF_TOKEN_CLEANUP_INTERVAL_SECS", "3600")
            .parse()
            .with_context(|| "parse CDF_TOKEN_CLEANUP_INTERVAL_SECS")?;
        let audit_retention: usize = env_or("CDF_AUDIT_RETENTION", "1000")
            .parse()
            .with_context(|| "parse CDF_AUDIT_RETENTION")?;
        let mock_api_enabled: bool = env_or("CDF_MOCK_API_ENABLED", "false")
            .parse()
            .with_context(|| "parse CDF_MOCK_API_ENABLED")?;
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            auth,
            token_cleanup_interval_secs,
            audit_retention,
            mock_api_enabled,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("CDF_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read CDF_CONFIG: {path}"))?;
            let override_cfg: GatewayConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse gateway config yaml")?;
            config.apply(override_cfg)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: GatewayConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value.parse::<StorageBackend>().with_context(|| "parse storage")?;
        }
        if let Some(url) = override_cfg.postgres_url {
            let pg = self.postgres.get_or_insert_with(|| PostgresConfig {
                url: String::new(),
                max_connections: 10,
                connect_timeout_ms: 5000,
                acquire_timeout_ms: 5000,
            });
            pg.url = url;
        }
        if let (Some(value), Some(pg)) = (override_cfg.postgres_max_connections, &mut self.postgres)
        {
            pg.max_connections = value;
        }
        if let Some(value) = override_cfg.jwt_issuer {
            self.auth.issuer = value;
        }
        if let Some(value) = override_cfg.jwt_audience {
            self.auth.audience = value;
        }
        if let Some(value) = override_cfg.jwt_leeway_secs {
            self.auth.leeway_secs = value;
        }
        if let Some(value) = override_cfg.token_cleanup_interval_secs {
            self.token_cleanup_interval_secs = value;
        }
        if let Some(value) = override_cfg.audit_retention {
            self.audit_retention = value;
        }
        if let Some(value) = override_cfg.mock_api_enabled {
            self.mock_api_enabled = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "CDF_BIND",
        "CDF_METRICS_BIND",
        "CDF_STORAGE",
        "CDF_POSTGRES_URL",
        "CDF_POSTGRES_MAX_CONNECTIONS",
        "CDF_JWT_SECRET",
        "CDF_JWT_ISSUER",
        "CDF_JWT_LEEWAY_SECS",
        "CDF_MOCK_API_ENABLED",
        "CDF_CONFIG",
    ];

    struct EnvSnapshot(Vec<(&'static str, Option<String>)>);

    impl EnvSnapshot {
        fn clean() -> Self {
            let saved = KEYS
                .iter()
                .map(|key| (*key, std::env::var(key).ok()))
                .collect();
            for key in KEYS {
                unsafe {
                    std::env::remove_var(key);
                }
            }
            Self(saved)
        }

        fn set(&self, key: &str, value: &str) {
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    impl Drop for EnvSnapshot {
        fn drop(&mut self) {
            for (key, value) in &self.0 {
                match value {
                    Some(value) => unsafe { std::env::set_var(key, value) },
                    None => unsafe { std::env::remove_var(key) },
                }
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_secret_is_set() {
        let env = EnvSnapshot::clean();
        env.set("CDF_JWT_SECRET", "dev-secret");
        let config = GatewayConfig::from_env().expect("config");
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().expect("addr"));
        assert_eq!(config.metrics_bind, "0.0.0.0:9090".parse().expect("addr"));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.postgres.is_none());
        assert_eq!(config.auth.issuer, "cdf-platform");
        assert_eq!(config.auth.audience, "authenticated");
        assert_eq!(config.auth.leeway_secs, 5);
        assert_eq!(config.token_cleanup_interval_secs, 3600);
        assert_eq!(config.audit_retention, 1000);
        assert!(!config.mock_api_enabled);
    }

    #[test]
    #[serial]
    fn missing_secret_is_an_error() {
        let _env = EnvSnapshot::clean();
        let err = GatewayConfig::from_env().expect_err("secret required");
        assert!(err.to_string().contains("CDF_JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn postgres_settings_are_read() {
        let env = EnvSnapshot::clean();
        env.set("CDF_JWT_SECRET", "dev-secret");
        env.set("CDF_STORAGE", "postgres");
        env.set("CDF_POSTGRES_URL", "postgres://localhost/cdf");
        env.set("CDF_POSTGRES_MAX_CONNECTIONS", "3");
        let config = GatewayConfig::from_env().expect("config");
        assert_eq!(config.storage, StorageBackend::Postgres);
        let pg = config.postgres.expect("postgres");
        assert_eq!(pg.url, "postgres://localhost/cdf");
        assert_eq!(pg.max_connections, 3);
        assert_eq!(pg.acquire_timeout_ms, 5000);
    }

    #[test]
    #[serial]
    fn invalid_values_are_rejected() {
        let env = EnvSnapshot::clean();
        env.set("CDF_JWT_SECRET", "dev-secret");
        env.set("CDF_STORAGE", "sqlite");
        assert!(GatewayConfig::from_env().is_err());
        env.set("CDF_STORAGE", "memory");
        env.set("CDF_BIND", "not-an-addr");
        let err = GatewayConfig::from_env().expect_err("bad bind");
        assert!(err.to_string().contains("CDF_BIND"));
    }

    #[test]
    #[serial]
    fn yaml_overrides_env() {
        let env = EnvSnapshot::clean();
        env.set("CDF_JWT_SECRET", "dev-secret");
        let path = std::env::temp_dir().join(format!("cdf-gateway-{}.yaml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "bind_addr: 127.0.0.1:7000\nmock_api_enabled: true\njwt_issuer: other\npostgres_url: postgres://db/cdf\n",
        )
        .expect("write yaml");
        env.set("CDF_CONFIG", path.to_str().expect("utf8 path"));
        let config = GatewayConfig::from_env_or_yaml().expect("config");
        let _ = fs::remove_file(&path);
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().expect("addr"));
        assert!(config.mock_api_enabled);
        assert_eq!(config.auth.issuer, "other");
        assert_eq!(config.postgres.expect("pg").url, "postgres://db/cdf");
    }

    #[test]
    fn auth_config_debug_hides_secret() {
        let auth = AuthConfig {
            jwt_secret: "super-secret".to_string(),
            issuer: "i".to_string(),
            audience: "a".to_string(),
            leeway_secs: 0,
        };
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
