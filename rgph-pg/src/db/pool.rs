//! Connexions à la base du recensement
//!
//! La configuration vient de l'environnement (`PGHOST`, `PGPORT`,
//! `PGDATABASE`, `PGUSER`, `PGPASSWORD`, `PGSSLMODE`, `POOL_SIZE`), les
//! options CLI la surchargent. TLS passe par rustls et les racines webpki.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

const DEFAULT_DBNAME: &str = "rgph";
const DEFAULT_POOL_SIZE: usize = 8;
const APPLICATION_NAME: &str = "rgph";

const WAIT_TIMEOUT: Duration = Duration::from_secs(30);
const CREATE_TIMEOUT: Duration = Duration::from_secs(10);
const RECYCLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    #[default]
    Disable,
    Prefer,
    Require,
}

impl SslMode {
    pub fn uses_tls(self) -> bool {
        !matches!(self, SslMode::Disable)
    }
}

impl FromStr for SslMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            other => Err(anyhow!(
                "Invalid SSL mode '{}' (expected disable, prefer or require)",
                other
            )),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
        })
    }
}

/// Paramètres de connexion et taille du pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub pool_size: usize,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: DEFAULT_DBNAME.into(),
            user: "postgres".into(),
            password: None,
            pool_size: DEFAULT_POOL_SIZE,
            ssl_mode: SslMode::Disable,
        }
    }
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl DatabaseConfig {
    /// Valeurs par défaut complétées par l'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("PGHOST").unwrap_or(defaults.host),
            port: env_parsed("PGPORT").unwrap_or(defaults.port),
            dbname: std::env::var("PGDATABASE").unwrap_or(defaults.dbname),
            user: std::env::var("PGUSER").unwrap_or(defaults.user),
            password: std::env::var("PGPASSWORD").ok(),
            pool_size: env_parsed("POOL_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.pool_size),
            ssl_mode: env_parsed("PGSSLMODE").unwrap_or(defaults.ssl_mode),
        }
    }

    /// Applique les options de ligne de commande
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        database: Option<String>,
        user: Option<String>,
        password: Option<String>,
        port: Option<u16>,
        ssl: Option<String>,
    ) -> Result<()> {
        self.host = host.unwrap_or_else(|| std::mem::take(&mut self.host));
        self.dbname = database.unwrap_or_else(|| std::mem::take(&mut self.dbname));
        self.user = user.unwrap_or_else(|| std::mem::take(&mut self.user));
        self.password = password.or_else(|| self.password.take());
        self.port = port.unwrap_or(self.port);
        if let Some(ssl) = ssl {
            self.ssl_mode = ssl.parse()?;
        }
        Ok(())
    }

    /// `user@host:port/base (SSL: mode)`, sans mot de passe
    pub fn target(&self) -> String {
        format!(
            "{}@{}:{}/{} (SSL: {})",
            self.user, self.host, self.port, self.dbname, self.ssl_mode
        )
    }

    fn pool_config(&self) -> Config {
        Config {
            host: Some(self.host.clone()),
            port: Some(self.port),
            dbname: Some(self.dbname.clone()),
            user: Some(self.user.clone()),
            password: self.password.clone(),
            application_name: Some(APPLICATION_NAME.into()),
            pool: Some(PoolConfig {
                max_size: self.pool_size,
                timeouts: Timeouts {
                    wait: Some(WAIT_TIMEOUT),
                    create: Some(CREATE_TIMEOUT),
                    recycle: Some(RECYCLE_TIMEOUT),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn tls_connector() -> MakeRustlsConnect {
    let roots: rustls::RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    MakeRustlsConnect::new(config)
}

/// Crée le pool; aucune connexion n'est ouverte avant le premier `get`
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let cfg = config.pool_config();
    let pool = if config.ssl_mode.uses_tls() {
        cfg.create_pool(Some(Runtime::Tokio1), tls_connector())
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
    };
    debug!(target = %config.target(), size = config.pool_size, "Database pool created");
    pool.with_context(|| format!("Failed to create database pool for {}", config.target()))
}

/// Ouvre une connexion et renvoie la version du serveur
pub async fn check_connection(pool: &Pool) -> Result<String> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    let row = client
        .query_one("SELECT current_setting('server_version')", &[])
        .await
        .context("Connection check failed")?;
    Ok(row.try_get(0)?)
}
