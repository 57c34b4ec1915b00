//! Worker descriptors.

use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Port a worker's HTTP API listens on unless configured otherwise.
pub const DEFAULT_WORKER_PORT: u16 = 3333;

/// Identifies one emulation node by the address of its control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub address: String,
    pub port: u16,
}

impl WorkerDescriptor {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Parse an operator-supplied worker entry.
    ///
    /// Accepts `host`, `ip`, `host:port`, `ip:port` and `[v6]:port`. Entries
    /// without a port use `default_port`.
    pub fn parse(entry: &str, default_port: u16) -> Result<Self, AddressError> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Ok(addr) = entry.parse::<SocketAddr>() {
            return Ok(Self::new(addr.ip().to_string(), addr.port()));
        }

        // A bare IPv6 address contains colons but no port.
        if let Ok(ip) = entry.parse::<IpAddr>() {
            return Ok(Self::new(ip.to_string(), default_port));
        }

        match entry.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidPort(entry.to_string()))?;
                Ok(Self::new(host, port))
            }
            Some(_) => Err(AddressError::Empty),
            None => Ok(Self::new(entry, default_port)),
        }
    }

    /// Parse a list of entries, failing on the first malformed one.
    pub fn parse_all<S: AsRef<str>>(
        entries: &[S],
        default_port: u16,
    ) -> Result<Vec<Self>, AddressError> {
        entries
            .iter()
            .map(|entry| Self::parse(entry.as_ref(), default_port))
            .collect()
    }

    /// Base URL of the worker's HTTP API, without a trailing slash.
    pub fn base_url(&self) -> String {
        if self.address.contains(':') {
            format!("http://[{}]:{}", self.address, self.port)
        } else {
            format!("http://{}:{}", self.address, self.port)
        }
    }
}

impl fmt::Display for WorkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.contains(':') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// `count` consecutive IPv4 addresses starting at `start`.
///
/// Only the last octet is incremented, so the whole range must fit in the
/// /24 of `start`.
pub fn ip_range(start: Ipv4Addr, count: usize) -> Result<Vec<Ipv4Addr>, AddressError> {
    let [a, b, c, d] = start.octets();
    if d as usize + count > 256 {
        return Err(AddressError::RangeOverflow {
            start: start.to_string(),
            count,
        });
    }
    Ok((0..count)
        .map(|i| Ipv4Addr::new(a, b, c, d + i as u8))
        .collect())
}
