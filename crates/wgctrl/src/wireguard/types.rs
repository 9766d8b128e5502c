//! WireGuard type definitions.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use super::key::Key;

/// Error returned when parsing a key or allowed IP from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what}: {reason}")]
pub struct ParseError {
    what: &'static str,
    reason: String,
}

impl ParseError {
    pub(crate) fn new(what: &'static str, reason: impl Into<String>) -> Self {
        Self {
            what,
            reason: reason.into(),
        }
    }
}

/// Which implementation backs a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DeviceType {
    /// Not yet tagged. Decoded devices carry this until a client sets it.
    #[default]
    Unknown,
    /// The in-kernel implementation, reached over Generic Netlink.
    LinuxKernel,
    /// A user-space implementation.
    Userspace,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::LinuxKernel => "Linux kernel",
            Self::Userspace => "userspace",
        })
    }
}

/// A WireGuard device as reported by the kernel.
///
/// Absent attributes leave the zero value in place: an unset port is 0,
/// an unset key is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Device {
    /// Interface name.
    pub name: String,
    /// Implementation backing the device.
    pub device_type: DeviceType,
    /// Private key. Only visible to privileged callers.
    pub private_key: Option<Key>,
    /// Public key (derived from the private key).
    pub public_key: Option<Key>,
    /// UDP listen port.
    pub listen_port: u16,
    /// Firewall mark for outgoing packets (0 = unset).
    pub firewall_mark: u32,
    /// Peers, in the order the kernel reported them.
    pub peers: Vec<Peer>,
}

impl Device {
    /// Find a peer by public key.
    pub fn peer(&self, public_key: &Key) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.public_key == public_key)
    }
}

/// A WireGuard peer as reported by the kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Peer {
    /// Peer's public key (identifies the peer).
    pub public_key: Key,
    /// Optional preshared key.
    pub preshared_key: Option<Key>,
    /// Peer's endpoint (IP:port).
    pub endpoint: Option<SocketAddr>,
    /// Persistent keepalive interval (zero = disabled).
    pub persistent_keepalive_interval: Duration,
    /// Last successful handshake, `None` if there never was one.
    pub last_handshake_time: Option<SystemTime>,
    /// Bytes received from this peer.
    pub receive_bytes: u64,
    /// Bytes sent to this peer.
    pub transmit_bytes: u64,
    /// Allowed IP ranges, in encounter order. Duplicates are kept.
    pub allowed_ips: Vec<AllowedIp>,
    /// Protocol version (typically 1).
    pub protocol_version: u32,
}

impl Peer {
    /// Create a peer with the given public key and every other field zero.
    pub fn new(public_key: Key) -> Self {
        Self {
            public_key,
            ..Default::default()
        }
    }

    /// Get the duration since last handshake.
    pub fn time_since_handshake(&self) -> Option<Duration> {
        self.last_handshake_time
            .and_then(|t| SystemTime::now().duration_since(t).ok())
    }
}

/// An allowed IP range for a WireGuard peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllowedIp {
    /// IP address (network portion).
    pub addr: IpAddr,
    /// CIDR prefix length.
    pub cidr: u8,
}

impl AllowedIp {
    /// Create an IPv4 allowed IP range.
    pub fn v4(addr: Ipv4Addr, cidr: u8) -> Self {
        Self {
            addr: IpAddr::V4(addr),
            cidr: cidr.min(32),
        }
    }

    /// Create an IPv6 allowed IP range.
    pub fn v6(addr: Ipv6Addr, cidr: u8) -> Self {
        Self {
            addr: IpAddr::V6(addr),
            cidr: cidr.min(128),
        }
    }

    /// Get the address family (AF_INET or AF_INET6).
    pub fn family(&self) -> u16 {
        match self.addr {
            IpAddr::V4(_) => libc::AF_INET as u16,
            IpAddr::V6(_) => libc::AF_INET6 as u16,
        }
    }

    /// Largest prefix length for this address family.
    pub fn max_cidr(&self) -> u8 {
        match self.addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }

    /// Get the address bytes.
    pub fn addr_bytes(&self) -> Vec<u8> {
        match self.addr {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        }
    }
}

impl fmt::Display for AllowedIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.cidr)
    }
}

impl FromStr for AllowedIp {
    type Err = ParseError;

    /// Parse `addr/cidr`. A bare address gets the full-length prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, cidr) = match s.split_once('/') {
            Some((addr, cidr)) => (addr, Some(cidr)),
            None => (s, None),
        };

        let addr: IpAddr = addr
            .trim()
            .parse()
            .map_err(|e: std::net::AddrParseError| ParseError::new("allowed ip", e.to_string()))?;
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let cidr = match cidr {
            Some(c) => c
                .trim()
                .parse::<u8>()
                .map_err(|e| ParseError::new("allowed ip", e.to_string()))?,
            None => max,
        };
        if cidr > max {
            return Err(ParseError::new(
                "allowed ip",
                format!("prefix length {} exceeds {}", cidr, max),
            ));
        }

        Ok(Self { addr, cidr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_ip_v4() {
        let ip = AllowedIp::v4(Ipv4Addr::new(10, 0, 0, 0), 8);
        assert_eq!(ip.family(), libc::AF_INET as u16);
        assert_eq!(ip.cidr, 8);
        assert_eq!(ip.addr_bytes(), vec![10, 0, 0, 0]);
        assert_eq!(ip.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_allowed_ip_v6() {
        let ip = AllowedIp::v6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 0), 64);
        assert_eq!(ip.family(), libc::AF_INET6 as u16);
        assert_eq!(ip.max_cidr(), 128);
        assert_eq!(ip.to_string(), "fd00::/64");
    }

    #[test]
    fn test_allowed_ip_from_str() {
        let ip: AllowedIp = "192.168.4.0/24".parse().unwrap();
        assert_eq!(ip, AllowedIp::v4(Ipv4Addr::new(192, 168, 4, 0), 24));

        let ip: AllowedIp = "fd00::1".parse().unwrap();
        assert_eq!(ip.cidr, 128);

        assert!("10.0.0.0/33".parse::<AllowedIp>().is_err());
        assert!("10.0.0/8".parse::<AllowedIp>().is_err());
        assert!("10.0.0.0/x".parse::<AllowedIp>().is_err());
    }

    #[test]
    fn test_device_peer_lookup() {
        let a = Key::new([1u8; 32]);
        let b = Key::new([2u8; 32]);
        let device = Device {
            name: "wg0".into(),
            peers: vec![Peer::new(a), Peer::new(b)],
            ..Default::default()
        };
        assert_eq!(device.peer(&b).map(|p| p.public_key), Some(b));
        assert!(device.peer(&Key::new([3u8; 32])).is_none());
    }

    #[test]
    fn test_time_since_handshake() {
        let mut peer = Peer::new(Key::new([1u8; 32]));
        assert!(peer.time_since_handshake().is_none());

        peer.last_handshake_time = Some(SystemTime::now() - Duration::from_secs(60));
        let since = peer.time_since_handshake().unwrap();
        assert!(since >= Duration::from_secs(60));
    }
}
