//! Configuration for tetromino-catalog

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tetromino-catalog")
}

/// Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory holding `data/blocks.json` and `images/`
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Address to bind the HTTP API to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_http_port() -> u16 {
    8090
}

fn default_max_body_bytes() -> usize {
    crate::http::DEFAULT_MAX_BODY_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CatalogError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CatalogError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Socket address of the HTTP API
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }

    /// Get the shape collection file path
    pub fn data_file(&self) -> PathBuf {
        self.storage_dir.join("data").join("blocks.json")
    }

    /// Get uploaded images directory
    pub fn images_dir(&self) -> PathBuf {
        self.storage_dir.join(crate::images::IMAGE_URL_PREFIX)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}
