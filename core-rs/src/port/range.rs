/**
 * range.rs
 * Allocatable port range and its discovery from the kernel
 *
 * The range is read once from the ephemeral port range parameter:
 * - Linux: /proc/sys/net/ipv4/ip_local_port_range ("start\tend")
 * - Anywhere the parameter is missing or unreadable: 49153-65535
 *
 * Discovery never fails. A bad source is reported through tracing and
 * the built-in defaults are used instead.
 */

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::{PortPoolError, Result};

/// First port of the built-in range
pub const DEFAULT_PORT_RANGE_START: u16 = 49153;

/// Last port of the built-in range
pub const DEFAULT_PORT_RANGE_END: u16 = 65535;

/// Kernel parameter holding the ephemeral port range
pub const IP_LOCAL_PORT_RANGE: &str = "/proc/sys/net/ipv4/ip_local_port_range";

/// Inclusive port range `[start, end]`
///
/// Only built through [`PortRange::new`], discovery, or `Default`, so
/// `0 < start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Build a range, rejecting port 0 and inverted bounds
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start == 0 {
            return Err(PortPoolError::InvalidRange(format!(
                "range start must be greater than 0 (got {}-{})",
                start, end
            )));
        }
        if start > end {
            return Err(PortPoolError::InvalidRange(format!(
                "range start {} is greater than end {}",
                start, end
            )));
        }
        Ok(PortRange { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    /// Number of ports in the range
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Always false: `start <= end` is checked by every constructor
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Discover the range from the kernel parameter
    pub fn discover() -> Self {
        Self::discover_from(IP_LOCAL_PORT_RANGE)
    }

    /// Discover the range from `source`, falling back to the defaults
    ///
    /// # Arguments
    /// * `source` - File holding `start<whitespace>end`
    pub fn discover_from<P: AsRef<Path>>(source: P) -> Self {
        let source = source.as_ref();

        let content = match fs::read_to_string(source) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    "Failed to read port range kernel parameter, using defaults"
                );
                return Self::default();
            }
        };

        match parse_port_range(&content) {
            Ok(range) => {
                debug!(source = %source.display(), start = range.start, end = range.end, "Discovered port range");
                range
            }
            Err(e) => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    "Failed to parse port range, using defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for PortRange {
    fn default() -> Self {
        PortRange {
            start: DEFAULT_PORT_RANGE_START,
            end: DEFAULT_PORT_RANGE_END,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parse `"start\tend"` content into a range
///
/// Any whitespace separates the two fields; exactly two are required.
pub fn parse_port_range(content: &str) -> Result<PortRange> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(PortPoolError::InvalidRange(format!(
            "unexpected count of parsed numbers ({})",
            fields.len()
        )));
    }

    let parse = |field: &str| {
        field.parse::<u16>().map_err(|e| {
            PortPoolError::InvalidRange(format!("invalid port '{}': {}", field, e))
        })
    };

    PortRange::new(parse(fields[0])?, parse(fields[1])?)
}
