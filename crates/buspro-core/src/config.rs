//! Configuration model and loading.
//!
//! Sources, in priority order:
//! 1. Environment variables (see [`env_vars`])
//! 2. An explicit TOML file, or `buspro.toml` in the working directory
//! 3. Built-in defaults (see [`defaults`])

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::{config_err, validation_err};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "buspro.toml";

/// Default values.
pub mod defaults {
    use std::net::Ipv4Addr;

    use crate::address::Address;

    pub const GATEWAY_HOST: &str = "192.168.10.255";
    pub const GATEWAY_PORT: u16 = 6000;
    pub const LISTEN_HOST: &str = "0.0.0.0";
    pub const LISTEN_PORT: u16 = 6000;
    pub const SOURCE_ADDRESS: Address = Address::CONTROLLER;
    pub const ORIGIN_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 15);
    pub const SETTLE_DELAY_MS: u64 = 500;
    pub const RECV_BUFFER_SIZE: usize = 2048;

    pub const TICK_MS: u64 = 1000;
    pub const DEFAULT_INTERVAL_SECS: u64 = 10;
}

/// Environment variable names.
pub mod env_vars {
    pub const GATEWAY_HOST: &str = "BUSPRO_GATEWAY_HOST";
    pub const GATEWAY_PORT: &str = "BUSPRO_GATEWAY_PORT";
    pub const LISTEN_PORT: &str = "BUSPRO_LISTEN_PORT";
    pub const DEFAULT_INTERVAL: &str = "BUSPRO_DEFAULT_INTERVAL";
    /// Read by the binary when initialising logging.
    pub const LOG_JSON: &str = "BUSPRO_LOG_JSON";
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusproConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Transport and façade settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Where outgoing datagrams are sent; usually a broadcast address.
    #[serde(default = "default_gateway_host")]
    pub gateway_host: String,

    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Local port to bind; 0 picks an ephemeral port.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Bus address stamped on outgoing telegrams.
    #[serde(default = "default_source_address")]
    pub source_address: Address,

    /// IPv4 written into the first four preamble bytes.
    #[serde(default = "default_origin_ip")]
    pub origin_ip: Ipv4Addr,

    /// Pause between stop and start on reconfigure.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Also route telegrams to handlers registered under their target address.
    #[serde(default)]
    pub match_target: bool,

    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

fn default_gateway_host() -> String {
    defaults::GATEWAY_HOST.to_string()
}

fn default_gateway_port() -> u16 {
    defaults::GATEWAY_PORT
}

fn default_listen_host() -> String {
    defaults::LISTEN_HOST.to_string()
}

fn default_listen_port() -> u16 {
    defaults::LISTEN_PORT
}

fn default_source_address() -> Address {
    defaults::SOURCE_ADDRESS
}

fn default_origin_ip() -> Ipv4Addr {
    defaults::ORIGIN_IP
}

fn default_settle_delay_ms() -> u64 {
    defaults::SETTLE_DELAY_MS
}

fn default_recv_buffer_size() -> usize {
    defaults::RECV_BUFFER_SIZE
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            gateway_host: default_gateway_host(),
            gateway_port: default_gateway_port(),
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            source_address: default_source_address(),
            origin_ip: default_origin_ip(),
            settle_delay_ms: default_settle_delay_ms(),
            match_target: false,
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

impl BusConfig {
    pub fn with_gateway(mut self, host: impl Into<String>, port: u16) -> Self {
        self.gateway_host = host.into();
        self.gateway_port = port;
        self
    }

    pub fn with_listen(mut self, host: impl Into<String>, port: u16) -> Self {
        self.listen_host = host.into();
        self.listen_port = port;
        self
    }

    pub fn with_source_address(mut self, address: Address) -> Self {
        self.source_address = address;
        self
    }

    pub fn with_match_target(mut self, enabled: bool) -> Self {
        self.match_target = enabled;
        self
    }

    pub fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Resolve the gateway endpoint.
    pub fn gateway_addr(&self) -> Result<SocketAddr> {
        resolve(&self.gateway_host, self.gateway_port)
    }

    /// Resolve the local bind endpoint.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        resolve(&self.listen_host, self.listen_port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway_host.trim().is_empty() {
            return Err(validation_err!("bus.gateway_host must not be empty"));
        }
        if self.gateway_port == 0 {
            return Err(validation_err!("bus.gateway_port must not be 0"));
        }
        if self.recv_buffer_size < crate::codec::MIN_FRAME_LEN {
            return Err(validation_err!(
                "bus.recv_buffer_size {} is smaller than a minimal frame ({})",
                self.recv_buffer_size,
                crate::codec::MIN_FRAME_LEN
            ));
        }
        Ok(())
    }
}

/// Polling scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tick period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Re-service cadence for opportunistic (interval 0) consumers.
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: u64,
}

fn default_tick_ms() -> u64 {
    defaults::TICK_MS
}

fn default_interval_secs() -> u64 {
    defaults::DEFAULT_INTERVAL_SECS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            default_interval_secs: default_interval_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms)
    }

    pub fn default_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.default_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(validation_err!("scheduler.tick_ms must be greater than 0"));
        }
        if self.default_interval_secs == 0 {
            return Err(validation_err!(
                "scheduler.default_interval_secs must be greater than 0"
            ));
        }
        Ok(())
    }
}

impl BusproConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Parse {
            location: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_err!("cannot read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| Error::Parse {
            location: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load with full priority handling, then validate.
    ///
    /// An explicit path must exist. Without one, `buspro.toml` in the working
    /// directory is used when present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(category = "config", path = %path.display(), "Loading config file");
                Self::from_file(path)?
            }
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    info!(category = "config", path = DEFAULT_CONFIG_FILE, "Loading config file");
                    Self::from_file(fallback)?
                } else {
                    debug!(category = "config", "No config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. Malformed numeric values are rejected.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, e.g. a map in tests.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(env_vars::GATEWAY_HOST) {
            self.bus.gateway_host = host;
        }
        if let Some(port) = lookup(env_vars::GATEWAY_PORT) {
            self.bus.gateway_port = parse_env(env_vars::GATEWAY_PORT, &port)?;
        }
        if let Some(port) = lookup(env_vars::LISTEN_PORT) {
            self.bus.listen_port = parse_env(env_vars::LISTEN_PORT, &port)?;
        }
        if let Some(secs) = lookup(env_vars::DEFAULT_INTERVAL) {
            self.scheduler.default_interval_secs = parse_env(env_vars::DEFAULT_INTERVAL, &secs)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.bus.validate()?;
        self.scheduler.validate()
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| config_err!("{} has invalid value '{}'", key, value))
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|e| config_err!("cannot resolve {}:{}: {}", host, port, e))?
        .next()
        .ok_or_else(|| config_err!("no address found for {}:{}", host, port))
}
