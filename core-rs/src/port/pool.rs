/**
 * pool.rs
 * Process-wide pool of allocated host ports
 *
 * Table layout:
 * - IP (textual form) → ProtocolMap
 * - ProtocolMap       → PortSet for tcp and PortSet for udp
 * - PortSet           → allocated ports + round-robin cursor
 *
 * Allocation strategy for "any port" requests (port 0):
 * - Scan starts just after the cursor and wraps from end back to start
 * - The cursor starts at the range end, so a fresh PortSet hands out
 *   range.start first, then range.start + 1, ...
 * - At most one full lap per request; a failed lap leaves the cursor alone
 *
 * Example with range [49153, 49154]:
 * - request_port(ip, "tcp", 0) → 49153
 * - request_port(ip, "tcp", 0) → 49154
 * - request_port(ip, "tcp", 0) → AllPortsAllocated
 *
 * One mutex guards the whole table. No I/O happens while it is held.
 */

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::config::PoolConfig;
use crate::errors::{PortPoolError, Result};
use crate::port::protocol::Protocol;
use crate::port::range::PortRange;

/// Address used as the table key when a request carries no IP
pub const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

static PORT_POOL_INSTANCE: OnceCell<PortPool> = OnceCell::new();

/// Allocated ports for one (IP, protocol) pair
#[derive(Debug, Clone)]
struct PortSet {
    ports: HashSet<u16>,
    last: u16,
}

impl PortSet {
    fn new(range: PortRange) -> Self {
        PortSet {
            ports: HashSet::new(),
            last: range.end(),
        }
    }

    /// Mark a specific port as allocated
    ///
    /// # Returns
    /// false if the port was already allocated
    fn insert(&mut self, port: u16) -> bool {
        self.ports.insert(port)
    }

    fn remove(&mut self, port: u16) {
        self.ports.remove(&port);
    }

    fn contains(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }

    /// Round-robin search for a free port, resuming after `last`
    fn find_port(&mut self, range: PortRange) -> Result<u16> {
        let mut port = self.last;

        for _ in 0..range.len() {
            port = if port >= range.end() {
                range.start()
            } else {
                port + 1
            };

            if self.ports.insert(port) {
                self.last = port;
                return Ok(port);
            }
        }

        Err(PortPoolError::AllPortsAllocated)
    }
}

/// Per-IP allocation state, split by protocol
#[derive(Debug, Clone)]
struct ProtocolMap {
    tcp: PortSet,
    udp: PortSet,
}

impl ProtocolMap {
    fn new(range: PortRange) -> Self {
        ProtocolMap {
            tcp: PortSet::new(range),
            udp: PortSet::new(range),
        }
    }

    fn get(&self, proto: Protocol) -> &PortSet {
        match proto {
            Protocol::Tcp => &self.tcp,
            Protocol::Udp => &self.udp,
        }
    }

    fn get_mut(&mut self, proto: Protocol) -> &mut PortSet {
        match proto {
            Protocol::Tcp => &mut self.tcp,
            Protocol::Udp => &mut self.udp,
        }
    }
}

/// Port Pool - hands out host ports per IP and protocol
///
/// Construct one per allocation authority and share it by reference,
/// or use [`PortPool::global`] for the process-wide instance.
#[derive(Debug)]
pub struct PortPool {
    range: PortRange,
    default_ip: IpAddr,
    table: Mutex<HashMap<String, ProtocolMap>>,
}

impl PortPool {
    /// Create a pool over the range discovered from the kernel
    pub fn new() -> Self {
        Self::with_range(PortRange::discover())
    }

    /// Create a pool over an explicit range
    pub fn with_range(range: PortRange) -> Self {
        PortPool {
            range,
            default_ip: DEFAULT_IP,
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Create a pool from startup configuration
    ///
    /// Discovery reads the configured range source; the default IP
    /// replaces `0.0.0.0` for requests without an address.
    pub fn from_config(config: &PoolConfig) -> Self {
        PortPool {
            range: config.discover_range(),
            default_ip: config.default_ip,
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide pool, discovered on first use
    ///
    /// # Returns
    /// Reference to singleton PortPool instance
    pub fn global() -> &'static Self {
        PORT_POOL_INSTANCE.get_or_init(Self::new)
    }

    /// Request a port for `ip` and `proto`
    ///
    /// # Arguments
    /// * `ip` - Address to allocate on; `None` uses the default IP
    /// * `proto` - "tcp" or "udp"
    /// * `port` - Specific port, or 0 for any free port in the range
    ///
    /// # Errors
    /// - `UnknownProtocol` if `proto` is not tcp/udp (nothing is recorded)
    /// - `AlreadyAllocated` if the specific port is taken for this IP
    /// - `AllPortsAllocated` if no port in the range is free
    pub fn request_port(&self, ip: Option<IpAddr>, proto: &str, port: u16) -> Result<u16> {
        let proto: Protocol = proto.parse()?;
        let key = self.ip_key(ip);
        let range = self.range;

        let mut table = self.table();
        let mapping = table
            .entry(key.clone())
            .or_insert_with(|| ProtocolMap::new(range));

        if port > 0 {
            if mapping.get_mut(proto).insert(port) {
                return Ok(port);
            }
            return Err(PortPoolError::already_allocated(key, port));
        }

        mapping.get_mut(proto).find_port(range)
    }

    /// Release a port for `ip` and `proto`
    ///
    /// Releasing a port that was never allocated, on an IP that was never
    /// seen, or under an unknown protocol does nothing.
    pub fn release_port(&self, ip: Option<IpAddr>, proto: &str, port: u16) -> Result<()> {
        let key = self.ip_key(ip);

        let mut table = self.table();
        let Some(mapping) = table.get_mut(&key) else {
            return Ok(());
        };

        match proto.parse::<Protocol>() {
            Ok(proto) => mapping.get_mut(proto).remove(port),
            Err(_) => trace!(ip = %key, proto, port, "Ignoring release for unknown protocol"),
        }

        Ok(())
    }

    /// Release every port for every IP
    pub fn release_all(&self) -> Result<()> {
        *self.table() = HashMap::new();
        Ok(())
    }

    /// Discovered range as `(start, end)`
    pub fn port_range(&self) -> (u16, u16) {
        (self.range.start(), self.range.end())
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Address used when a request carries no IP
    pub fn default_ip(&self) -> IpAddr {
        self.default_ip
    }

    /// Check whether a port is currently held for `ip` and `proto`
    pub fn is_allocated(&self, ip: Option<IpAddr>, proto: &str, port: u16) -> bool {
        let Ok(proto) = proto.parse::<Protocol>() else {
            return false;
        };

        self.table()
            .get(&self.ip_key(ip))
            .is_some_and(|mapping| mapping.get(proto).contains(port))
    }

    /// Ports currently held for `ip` and `proto`, in ascending order
    pub fn allocated_ports(&self, ip: Option<IpAddr>, proto: &str) -> Vec<u16> {
        let Ok(proto) = proto.parse::<Protocol>() else {
            return Vec::new();
        };

        let mut ports: Vec<u16> = self
            .table()
            .get(&self.ip_key(ip))
            .map(|mapping| mapping.get(proto).ports.iter().copied().collect())
            .unwrap_or_default();
        ports.sort_unstable();
        ports
    }

    fn ip_key(&self, ip: Option<IpAddr>) -> String {
        ip.unwrap_or(self.default_ip).to_canonical().to_string()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, ProtocolMap>> {
        // Every critical section leaves the table consistent, so a panic
        // elsewhere while holding the lock does not corrupt it.
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PortPool {
    fn default() -> Self {
        Self::new()
    }
}
