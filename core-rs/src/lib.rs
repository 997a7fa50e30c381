//! # portpool - in-process host port allocation
//!
//! Tracks which host ports are in use per IP address and per transport
//! protocol, and hands out unused ones on demand. A container runtime uses it
//! to make sure two containers created at the same time never get the same
//! host port.
//!
//! ## Operations
//!
//! - [`PortPool::request_port`] - a specific port, or any free one (port 0)
//! - [`PortPool::release_port`] - give a port back (never fails)
//! - [`PortPool::release_all`] - forget every allocation
//! - [`PortPool::port_range`] - the range "any port" requests draw from
//!
//! ## Layout
//!
//! ```text
//! PortPool (one Mutex)
//!   └── "10.0.0.1" ──┬── tcp: { ports, last }
//!                    └── udp: { ports, last }
//! ```
//!
//! State lives in memory only. Nothing here binds sockets or checks whether a
//! port is free at the OS level.

pub mod config;
pub mod errors;
pub mod port;


pub use config::PoolConfig;
pub use errors::{PortAlreadyAllocated, PortPoolError, Result};
pub use port::{
    parse_port_range, PortPool, PortRange, Protocol, DEFAULT_IP, DEFAULT_PORT_RANGE_END,
    DEFAULT_PORT_RANGE_START, IP_LOCAL_PORT_RANGE,
};
