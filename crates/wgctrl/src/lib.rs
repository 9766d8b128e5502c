//! WireGuard configuration client for Linux.
//!
//! This crate reads and writes the running configuration of kernel
//! WireGuard interfaces over the `wireguard` Generic Netlink family:
//! keys, listen port, firewall mark, and every peer's endpoint,
//! keepalive, traffic counters, last handshake and allowed IPs.
//!
//! All calls are blocking. The client is built on two traits,
//! [`Transport`](wireguard::Transport) and
//! [`InterfaceEnumerator`](wireguard::InterfaceEnumerator), with
//! netlink-backed implementations provided.
//!
//! # Features
//!
//! - `serde` - Derive `Serialize` for devices, peers, allowed IPs and keys
//! - `integration` - Build the kernel integration tests (root only)
//!
//! # Example
//!
//! ```rust,no_run
//! use wgctrl::wireguard::Client;
//!
//! fn main() -> wgctrl::Result<()> {
//!     let client = Client::kernel()?;
//!
//!     for device in client.devices()? {
//!         println!("interface: {}", device.name);
//!         println!("  listening port: {}", device.listen_port);
//!         for peer in &device.peers {
//!             println!("  peer: {}", peer.public_key);
//!             if let Some(endpoint) = peer.endpoint {
//!                 println!("    endpoint: {}", endpoint);
//!             }
//!             println!(
//!                 "    transfer: {} B received, {} B sent",
//!                 peer.receive_bytes, peer.transmit_bytes
//!             );
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod netlink;
pub mod wireguard;

// Re-export common types at crate root for convenience
pub use netlink::{Error, InterfaceRef, Result};
pub use wireguard::{
    AllowedIp, Client, ClientOptions, Config, Device, DeviceType, Key, Peer, PeerConfig,
};
