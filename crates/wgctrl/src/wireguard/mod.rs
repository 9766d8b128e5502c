//! WireGuard device inspection and configuration over Generic Netlink.
//!
//! WireGuard links are created with standard RTNetlink, but everything
//! else (keys, listen port, peers, allowed IPs) goes through the
//! `wireguard` GENL family. This module decodes the family's attribute
//! trees into [`Device`] records, reassembles devices the kernel split
//! across several dump messages, and encodes [`Config`] changes back into
//! `WG_CMD_SET_DEVICE` requests.
//!
//! # Example
//!
//! ```rust,no_run
//! use wgctrl::wireguard::Client;
//!
//! # fn example() -> wgctrl::Result<()> {
//! let client = Client::kernel()?;
//!
//! for device in client.devices()? {
//!     println!("{}: public key {:?}", device.name, device.public_key);
//!     for peer in &device.peers {
//!         println!("  peer {}", peer.public_key);
//!         for ip in &peer.allowed_ips {
//!             println!("    allowed ip {}", ip);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Setting Configuration
//!
//! ```rust,no_run
//! use wgctrl::wireguard::{AllowedIp, Client, Config, Key, PeerConfig};
//! use std::net::{Ipv4Addr, SocketAddrV4};
//! use std::time::Duration;
//!
//! # fn example(private_key: Key, peer_key: Key) -> wgctrl::Result<()> {
//! let client = Client::kernel()?;
//!
//! let config = Config::new()
//!     .private_key(private_key)
//!     .listen_port(51820)
//!     .peer(
//!         PeerConfig::new(peer_key)
//!             .endpoint(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 1), 51820).into())
//!             .persistent_keepalive_interval(Duration::from_secs(25))
//!             .allowed_ip(AllowedIp::v4(Ipv4Addr::new(10, 0, 0, 0), 24)),
//!     );
//! client.configure_device("wg0", &config)?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod encode;
mod kernel;
mod key;
mod merge;
mod parse;
pub mod raw;
mod types;

pub use client::{Client, ClientOptions, InterfaceEnumerator, Request, Transport};
pub use config::{Config, PeerConfig};
pub use encode::{encode_batches, encode_device};
pub use kernel::{KernelTransport, LinkEnumerator};
pub use key::{Key, WG_KEY_LEN};
pub use merge::{DeviceAssembler, assemble};
pub use parse::{parse_allowed_ip, parse_device, parse_peer};
pub use types::{AllowedIp, Device, DeviceType, ParseError, Peer};

/// WireGuard Generic Netlink family name.
pub const WG_GENL_NAME: &str = "wireguard";

/// WireGuard Generic Netlink version.
pub const WG_GENL_VERSION: u8 = 1;

/// Link kind reported in `IFLA_INFO_KIND` for WireGuard interfaces.
pub const WG_LINK_KIND: &str = "wireguard";

/// WireGuard GENL commands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WgCmd {
    GetDevice = 0,
    SetDevice = 1,
}

/// WireGuard device attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WgDeviceAttr {
    Unspec = 0,
    Ifindex = 1,
    Ifname = 2,
    PrivateKey = 3,
    PublicKey = 4,
    Flags = 5,
    ListenPort = 6,
    Fwmark = 7,
    Peers = 8,
}

/// WireGuard peer attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WgPeerAttr {
    Unspec = 0,
    PublicKey = 1,
    PresharedKey = 2,
    Flags = 3,
    Endpoint = 4,
    PersistentKeepalive = 5,
    LastHandshake = 6,
    RxBytes = 7,
    TxBytes = 8,
    AllowedIps = 9,
    ProtocolVersion = 10,
}

/// WireGuard allowed IP attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WgAllowedIpAttr {
    Unspec = 0,
    Family = 1,
    IpAddr = 2,
    CidrMask = 3,
}

/// WireGuard device flags.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WgDeviceFlag {
    /// Replace all peers instead of adding
    ReplacePeers = 1 << 0,
}

/// Peer flags for SET_DEVICE operations.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WgPeerFlag {
    /// Remove this peer.
    RemoveMe = 1 << 0,
    /// Replace all allowed IPs (instead of adding).
    ReplaceAllowedIps = 1 << 1,
    /// Only update the peer if it already exists.
    UpdateOnly = 1 << 2,
}
