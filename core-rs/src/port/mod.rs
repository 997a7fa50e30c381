/**
 * port module
 * In-memory host port allocation per IP and protocol
 */

pub mod pool;
pub mod protocol;
pub mod range;

pub use pool::{PortPool, DEFAULT_IP};
pub use protocol::Protocol;
pub use range::{
    parse_port_range, PortRange, DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START,
    IP_LOCAL_PORT_RANGE,
};
