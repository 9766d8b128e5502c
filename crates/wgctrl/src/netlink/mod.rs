//! Blocking netlink plumbing for the WireGuard client.
//!
//! Only what talking to the `wireguard` Generic Netlink family needs:
//! attribute encoding and decoding, message framing, a blocking socket,
//! GENL family resolution and an RTNetlink link dump for discovering
//! WireGuard interfaces.
//!
//! # Attribute streams
//!
//! ```
//! use wgctrl::netlink::{AttrBuilder, AttrIter};
//!
//! let mut attrs = AttrBuilder::new();
//! attrs.append_attr_str(2, "wg0");
//! attrs.append_attr_u16(6, 51820);
//!
//! let decoded: Vec<_> = AttrIter::new(attrs.as_bytes())
//!     .collect::<wgctrl::Result<_>>()
//!     .unwrap();
//! assert_eq!(decoded.len(), 2);
//! assert_eq!(decoded[1], (6, &51820u16.to_ne_bytes()[..]));
//! ```

pub mod attr;
pub mod builder;
mod error;
pub mod genl;
mod interface_ref;
pub mod link;
pub mod message;
pub mod socket;

pub use attr::{AttrIter, NlAttr};
pub use builder::{AttrBuilder, MessageBuilder, NestToken};
pub use error::{Error, Result};
pub use interface_ref::InterfaceRef;
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use socket::{NetlinkSocket, Protocol};
