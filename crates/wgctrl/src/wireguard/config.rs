//! Desired-state configuration for `WG_CMD_SET_DEVICE`.

use std::net::SocketAddr;
use std::time::Duration;

use super::key::Key;
use super::types::AllowedIp;

/// Changes to apply to a device.
///
/// Every scalar is optional: `None` leaves the device's current value
/// alone. Peers are merged into the existing peer list unless
/// [`replace_peers`](Config::replace_peers) is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// New private key. [`Key::CLEAR`] removes the existing one.
    pub private_key: Option<Key>,
    /// New listen port.
    pub listen_port: Option<u16>,
    /// New firewall mark. Zero removes the existing one.
    pub firewall_mark: Option<u32>,
    /// Drop every peer not listed in `peers`.
    pub replace_peers: bool,
    /// Peers to add, update or remove.
    pub peers: Vec<PeerConfig>,
}

impl Config {
    /// Create an empty configuration (changes nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the private key.
    pub fn private_key(mut self, key: Key) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Set the listen port.
    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = Some(port);
        self
    }

    /// Set the firewall mark.
    pub fn firewall_mark(mut self, mark: u32) -> Self {
        self.firewall_mark = Some(mark);
        self
    }

    /// Replace all existing peers (instead of merging).
    pub fn replace_peers(mut self) -> Self {
        self.replace_peers = true;
        self
    }

    /// Add a peer to configure.
    pub fn peer(mut self, peer: PeerConfig) -> Self {
        self.peers.push(peer);
        self
    }

    /// Add multiple peers to configure.
    pub fn peers(mut self, peers: impl IntoIterator<Item = PeerConfig>) -> Self {
        self.peers.extend(peers);
        self
    }
}

/// Changes to apply to one peer, identified by its public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Public key of the peer to change.
    pub public_key: Key,
    /// Remove the peer. Other fields are ignored by the kernel.
    pub remove: bool,
    /// Only touch the peer if it already exists.
    pub update_only: bool,
    /// New preshared key. [`Key::CLEAR`] removes the existing one.
    pub preshared_key: Option<Key>,
    /// New endpoint.
    pub endpoint: Option<SocketAddr>,
    /// New keepalive interval, whole seconds up to `u16::MAX`. Zero disables it.
    pub persistent_keepalive_interval: Option<Duration>,
    /// Replace the peer's allowed IPs instead of adding to them.
    pub replace_allowed_ips: bool,
    /// Allowed IPs to add (or to set, with `replace_allowed_ips`).
    pub allowed_ips: Vec<AllowedIp>,
}

impl PeerConfig {
    /// Create a peer configuration that changes nothing yet.
    pub fn new(public_key: Key) -> Self {
        Self {
            public_key,
            remove: false,
            update_only: false,
            preshared_key: None,
            endpoint: None,
            persistent_keepalive_interval: None,
            replace_allowed_ips: false,
            allowed_ips: Vec::new(),
        }
    }

    /// Set the preshared key.
    pub fn preshared_key(mut self, key: Key) -> Self {
        self.preshared_key = Some(key);
        self
    }

    /// Set the endpoint address.
    pub fn endpoint(mut self, addr: SocketAddr) -> Self {
        self.endpoint = Some(addr);
        self
    }

    /// Set the persistent keepalive interval.
    pub fn persistent_keepalive_interval(mut self, interval: Duration) -> Self {
        self.persistent_keepalive_interval = Some(interval);
        self
    }

    /// Add an allowed IP range.
    pub fn allowed_ip(mut self, ip: AllowedIp) -> Self {
        self.allowed_ips.push(ip);
        self
    }

    /// Add multiple allowed IP ranges.
    pub fn allowed_ips(mut self, ips: impl IntoIterator<Item = AllowedIp>) -> Self {
        self.allowed_ips.extend(ips);
        self
    }

    /// Replace all existing allowed IPs instead of adding.
    pub fn replace_allowed_ips(mut self) -> Self {
        self.replace_allowed_ips = true;
        self
    }

    /// Only apply the change if the peer already exists.
    pub fn update_only(mut self) -> Self {
        self.update_only = true;
        self
    }

    /// Mark this peer for removal.
    pub fn remove(mut self) -> Self {
        self.remove = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_config_builder() {
        let key = Key::new([1u8; 32]);
        let config = Config::new()
            .private_key(key)
            .listen_port(51820)
            .firewall_mark(100)
            .replace_peers();

        assert_eq!(config.private_key, Some(key));
        assert_eq!(config.listen_port, Some(51820));
        assert_eq!(config.firewall_mark, Some(100));
        assert!(config.replace_peers);
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_peer_config_builder() {
        let pubkey = Key::new([2u8; 32]);
        let peer = PeerConfig::new(pubkey)
            .persistent_keepalive_interval(Duration::from_secs(25))
            .allowed_ip(AllowedIp::v4(Ipv4Addr::new(10, 0, 0, 0), 24))
            .replace_allowed_ips()
            .update_only();

        assert_eq!(peer.public_key, pubkey);
        assert_eq!(
            peer.persistent_keepalive_interval,
            Some(Duration::from_secs(25))
        );
        assert_eq!(peer.allowed_ips.len(), 1);
        assert!(peer.replace_allowed_ips);
        assert!(peer.update_only);
        assert!(!peer.remove);
    }
}
