//! RTNetlink link dump, used to discover interfaces by kind.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attr::{AttrIter, get};
use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NLM_F_DUMP, NLM_F_REQUEST, NlMsgError, NlMsgType};
use super::socket::{NetlinkSocket, Protocol};

/// Attribute IDs for IFLA_* constants.
mod attr_ids {
    pub const IFLA_IFNAME: u16 = 3;
    pub const IFLA_LINKINFO: u16 = 18;
}

/// Nested IFLA_INFO_* attribute IDs.
mod info_ids {
    pub const IFLA_INFO_KIND: u16 = 1;
}

/// Interface info message header (mirrors struct ifinfomsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfInfoMsg {
    pub ifi_family: u8,
    pub ifi_pad: u8,
    pub ifi_type: u16,
    pub ifi_index: i32,
    pub ifi_flags: u32,
    pub ifi_change: u32,
}

impl IfInfoMsg {
    /// Size of the header in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// The subset of a link the enumerator needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    /// Interface index.
    pub index: u32,
    /// Interface name (IFLA_IFNAME).
    pub name: String,
    /// Link kind from IFLA_LINKINFO (e.g. "wireguard", "veth").
    pub kind: Option<String>,
}

impl Link {
    /// Parse one RTM_NEWLINK payload (ifinfomsg followed by attributes).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (header, attrs) = IfInfoMsg::read_from_prefix(payload).map_err(|_| Error::Truncated {
            expected: IfInfoMsg::SIZE,
            actual: payload.len(),
        })?;

        let mut link = Link {
            index: header.ifi_index as u32,
            ..Default::default()
        };

        for attr in AttrIter::new(attrs) {
            let (attr_type, data) = attr?;
            match attr_type {
                attr_ids::IFLA_IFNAME => {
                    link.name = get::string(data, "link name")?.to_string();
                }
                attr_ids::IFLA_LINKINFO => {
                    for info in AttrIter::new(data) {
                        let (info_type, info_data) = info?;
                        if info_type == info_ids::IFLA_INFO_KIND {
                            link.kind = Some(get::string(info_data, "link kind")?.to_string());
                        }
                    }
                }
                _ => {} // Ignore unknown attributes
            }
        }

        Ok(link)
    }
}

/// Blocking RTNetlink connection for link queries.
pub struct LinkConnection {
    socket: NetlinkSocket,
}

impl LinkConnection {
    /// Open a NETLINK_ROUTE socket.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new(Protocol::Route)?,
        })
    }

    /// Dump every link in the current network namespace, in kernel order.
    pub fn get_links(&self) -> Result<Vec<Link>> {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST | NLM_F_DUMP);
        builder.append(&IfInfoMsg::default());

        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());
        self.socket.send(&builder.finish())?;

        let mut links = Vec::new();
        loop {
            let data = self.socket.recv_msg()?;
            for result in MessageIter::new(&data) {
                let (header, payload) = result?;

                if header.nlmsg_seq != seq {
                    continue;
                }

                if header.is_error() {
                    NlMsgError::from_bytes(payload)?
                        .check()
                        .map_err(|e| e.with_context("dumping links"))?;
                    continue;
                }

                if header.is_done() {
                    tracing::trace!(count = links.len(), "link dump complete");
                    return Ok(links);
                }

                if header.nlmsg_type == NlMsgType::RTM_NEWLINK {
                    links.push(Link::parse(payload)?);
                }
            }
        }
    }
}
