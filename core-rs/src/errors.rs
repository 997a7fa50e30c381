//! Error types for the port pool

use thiserror::Error;

/// A specific port was requested but is already held for that IP.
///
/// Carries the conflicting address and port so callers can build a precise
/// bind-conflict message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Bind for {ip}:{port} failed: port is already allocated")]
pub struct PortAlreadyAllocated {
    ip: String,
    port: u16,
}

impl PortAlreadyAllocated {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        PortAlreadyAllocated {
            ip: ip.into(),
            port,
        }
    }

    /// Conflicting IP address in its textual form
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Conflicting port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `ip:port` form of the conflict
    pub fn ip_port(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Error, Debug)]
pub enum PortPoolError {
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error(transparent)]
    AlreadyAllocated(#[from] PortAlreadyAllocated),

    #[error("all ports are allocated")]
    AllPortsAllocated,

    #[error("Invalid port range: {0}")]
    InvalidRange(String),

    #[error("Config validation error: {0}")]
    ValidationError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PortPoolError {
    /// Shorthand used by the request path
    pub(crate) fn already_allocated(ip: impl Into<String>, port: u16) -> Self {
        PortPoolError::AlreadyAllocated(PortAlreadyAllocated::new(ip, port))
    }
}

pub type Result<T> = std::result::Result<T, PortPoolError>;
