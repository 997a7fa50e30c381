/**
 * config.rs
 * Startup configuration for the port pool (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: portpool/v1
 * kind: PortPool
 * rangeSource: /proc/sys/net/ipv4/ip_local_port_range
 * defaultIp: 0.0.0.0
 * ```
 *
 * Read once before the pool is built. The range itself is never set here;
 * only the source that discovery reads from.
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::errors::{PortPoolError, Result};
use crate::port::pool::DEFAULT_IP;
use crate::port::range::{PortRange, IP_LOCAL_PORT_RANGE};

pub const API_VERSION: &str = "portpool/v1";
pub const KIND: &str = "PortPool";

/// Port pool configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub api_version: String,
    pub kind: String,
    /// File holding the ephemeral port range
    #[serde(default = "default_range_source")]
    pub range_source: PathBuf,
    /// Table key for requests that carry no IP
    #[serde(default = "default_ip")]
    pub default_ip: IpAddr,
}

fn default_range_source() -> PathBuf {
    PathBuf::from(IP_LOCAL_PORT_RANGE)
}

fn default_ip() -> IpAddr {
    DEFAULT_IP
}

impl PoolConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// - `FileNotFound` if the file does not exist
    /// - `Yaml` if the content is not valid YAML for this structure
    /// - `ValidationError` if apiVersion or kind is wrong
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PortPoolError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let content = fs::read_to_string(path)?;
        let config: PoolConfig = serde_yaml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration, using defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path) {
            Err(PortPoolError::FileNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Ensure apiVersion and kind match this crate
    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(PortPoolError::ValidationError(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }

        if self.kind != KIND {
            return Err(PortPoolError::ValidationError(format!(
                "Invalid kind: expected '{}', got '{}'",
                KIND, self.kind
            )));
        }

        Ok(())
    }

    /// Save configuration as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }

    /// Run range discovery against the configured source
    pub fn discover_range(&self) -> PortRange {
        PortRange::discover_from(&self.range_source)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            range_source: default_range_source(),
            default_ip: DEFAULT_IP,
        }
    }
}
