use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use pinboard_db::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db: DatabaseConfig,
    pub public_url: String,
    pub cat_api_url: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every setting through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("PINBOARD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("PINBOARD_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("PINBOARD_PORT must be a port number")?;

        let defaults = DatabaseConfig::default();
        let db = DatabaseConfig {
            path: lookup("PINBOARD_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            reader_pool_size: match lookup("PINBOARD_DB_READERS") {
                Some(v) => v.parse().context("PINBOARD_DB_READERS must be a number")?,
                None => defaults.reader_pool_size,
            },
        };

        let public_url = lookup("PINBOARD_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));
        let cat_api_url =
            lookup("PINBOARD_CAT_API_URL").unwrap_or_else(|| "https://http.cat".into());

        Ok(Self {
            host,
            port,
            db,
            public_url,
            cat_api_url,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("invalid listen address {}", addr))
    }
}
