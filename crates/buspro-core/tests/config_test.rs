//! Configuration loading tests.

use std::collections::HashMap;
use std::io::Write;
use std::net::Ipv4Addr;

use buspro_core::config::{env_vars, BusproConfig};
use buspro_core::{Address, Error};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = BusproConfig::from_toml_str(
        r#"
        [bus]
        gateway_host = "10.0.0.255"
        source_address = [1, 200]
        match_target = true
        "#,
    )
    .unwrap();

    assert_eq!(config.bus.gateway_host, "10.0.0.255");
    assert_eq!(config.bus.source_address, Address::new(1, 200));
    assert!(config.bus.match_target);
    assert_eq!(config.bus.gateway_port, 6000);
    assert_eq!(config.bus.origin_ip, Ipv4Addr::new(192, 168, 1, 15));
    assert_eq!(config.scheduler.tick_ms, 1000);
}

#[test]
fn test_empty_toml_is_default() {
    let config = BusproConfig::from_toml_str("").unwrap();
    assert_eq!(config, BusproConfig::default());
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let err = BusproConfig::from_toml_str("[bus\ngateway_port = 1").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[bus]\ngateway_port = 6001\norigin_ip = \"10.1.1.1\"\n\n[scheduler]\ndefault_interval_secs = 30"
    )
    .unwrap();

    let config = BusproConfig::from_file(file.path()).unwrap();
    assert_eq!(config.bus.gateway_port, 6001);
    assert_eq!(config.bus.origin_ip, Ipv4Addr::new(10, 1, 1, 1));
    assert_eq!(config.scheduler.default_interval_secs, 30);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        BusproConfig::from_file(&missing),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_env_overrides() {
    let mut config = BusproConfig::default();
    config
        .apply_env_with(lookup(&[
            (env_vars::GATEWAY_HOST, "127.0.0.1"),
            (env_vars::GATEWAY_PORT, "7000"),
            (env_vars::LISTEN_PORT, " 7001 "),
            (env_vars::DEFAULT_INTERVAL, "5"),
        ]))
        .unwrap();

    assert_eq!(config.bus.gateway_host, "127.0.0.1");
    assert_eq!(config.bus.gateway_port, 7000);
    assert_eq!(config.bus.listen_port, 7001);
    assert_eq!(config.scheduler.default_interval_secs, 5);
}

#[test]
fn test_invalid_env_value() {
    let mut config = BusproConfig::default();
    let err = config
        .apply_env_with(lookup(&[(env_vars::GATEWAY_PORT, "not-a-port")]))
        .unwrap_err();
    assert!(err.to_string().contains(env_vars::GATEWAY_PORT));
}

#[test]
fn test_validation() {
    let mut config = BusproConfig::default();
    config.bus.gateway_port = 0;
    assert!(matches!(config.validate(), Err(Error::Validation(_))));

    let mut config = BusproConfig::default();
    config.scheduler.tick_ms = 0;
    assert!(config.validate().is_err());

    let mut config = BusproConfig::default();
    config.scheduler.default_interval_secs = 0;
    assert!(config.validate().is_err());

    let mut config = BusproConfig::default();
    config.bus.recv_buffer_size = 16;
    assert!(config.validate().is_err());
}

#[test]
fn test_toml_output_parses_back() {
    let mut config = BusproConfig::default();
    config.bus.listen_port = 0;
    config.bus.source_address = Address::new(3, 4);

    let rendered = config.to_toml_string().unwrap();
    assert_eq!(BusproConfig::from_toml_str(&rendered).unwrap(), config);
}

#[test]
fn test_listen_addr() {
    let config = BusproConfig::from_toml_str("[bus]\nlisten_host = \"127.0.0.1\"\nlisten_port = 0").unwrap();
    let addr = config.bus.listen_addr().unwrap();
    assert!(addr.ip().is_loopback());
    assert_eq!(addr.port(), 0);
}
