//! Integration tests for building a pool from the environment
//!
//! Covers:
//! - Config file → range discovery → pool
//! - Fallback to the built-in range
//! - The process-wide instance

use portpool::{
    PoolConfig, PortPool, PortRange, DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START,
};
use std::fs;
use std::net::IpAddr;
use tempfile::TempDir;

#[test]
fn test_pool_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let range_source = temp_dir.path().join("ip_local_port_range");
    fs::write(&range_source, "32768\t32770\n").unwrap();

    // 1. Write config pointing discovery at the temp source
    let config_path = temp_dir.path().join("portpool.yaml");
    let config = PoolConfig {
        range_source: range_source.clone(),
        default_ip: "127.0.0.1".parse().unwrap(),
        ..PoolConfig::default()
    };
    config.save(&config_path).unwrap();

    // 2. Load and build
    let loaded = PoolConfig::load(&config_path).unwrap();
    let pool = PortPool::from_config(&loaded);

    // 3. Range and default IP come from the config
    assert_eq!(pool.port_range(), (32768, 32770));
    let default_ip: IpAddr = "127.0.0.1".parse().unwrap();
    assert_eq!(pool.default_ip(), default_ip);

    // 4. Requests without IP land on the configured default
    assert_eq!(pool.request_port(None, "tcp", 0).unwrap(), 32768);
    assert!(pool.is_allocated(Some(default_ip), "tcp", 32768));

    match pool.request_port(Some(default_ip), "tcp", 32768) {
        Err(portpool::PortPoolError::AlreadyAllocated(e)) => {
            assert_eq!(e.ip_port(), "127.0.0.1:32768")
        }
        other => panic!("Expected AlreadyAllocated, got {:?}", other),
    }
}

#[test]
fn test_pool_falls_back_to_default_range() {
    let temp_dir = TempDir::new().unwrap();
    let range_source = temp_dir.path().join("ip_local_port_range");
    fs::write(&range_source, "not a range").unwrap();

    let config = PoolConfig {
        range_source,
        ..PoolConfig::default()
    };
    let pool = PortPool::from_config(&config);

    assert_eq!(
        pool.port_range(),
        (DEFAULT_PORT_RANGE_START, DEFAULT_PORT_RANGE_END)
    );
    assert_eq!(pool.request_port(None, "udp", 0).unwrap(), 49153);
}

#[test]
fn test_pool_with_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = PoolConfig::load_or_default(temp_dir.path().join("absent.yaml")).unwrap();

    assert_eq!(config, PoolConfig::default());
    assert_eq!(PortPool::from_config(&config).default_ip().to_string(), "0.0.0.0");
}

#[test]
fn test_global_pool_is_shared() {
    let first = PortPool::global();
    let second = PortPool::global();
    assert!(std::ptr::eq(first, second));

    // Whatever the host reports, the range is usable
    let range = first.range();
    assert!(range.start() > 0);
    assert!(range.start() <= range.end());

    // Use a port under a dedicated IP so other tests sharing the global are unaffected
    let addr: IpAddr = "198.51.100.7".parse().unwrap();
    assert_eq!(first.request_port(Some(addr), "tcp", 7).unwrap(), 7);
    assert!(second.is_allocated(Some(addr), "tcp", 7));
    second.release_port(Some(addr), "tcp", 7).unwrap();
    assert!(!first.is_allocated(Some(addr), "tcp", 7));
}

#[test]
fn test_host_discovery_is_sane() {
    // Runs against the real kernel parameter, or the defaults where it is absent
    let range = PortRange::discover();
    assert!(range.start() > 0);
    assert!(range.start() <= range.end());
}
