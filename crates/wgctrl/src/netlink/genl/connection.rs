//! Generic Netlink connection with family resolution.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::header::{GENL_HDRLEN, GenlMsgHdr};
use super::{CtrlAttr, CtrlCmd, GENL_ID_CTRL};
use crate::netlink::attr::{AttrIter, get};
use crate::netlink::builder::{AttrBuilder, MessageBuilder};
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{
    MessageIter, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NlMsgError,
};
use crate::netlink::socket::{NetlinkSocket, Protocol};

/// Information about a Generic Netlink family.
#[derive(Debug, Clone)]
pub struct FamilyInfo {
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family version.
    pub version: u8,
}

/// Generic Netlink connection.
///
/// Provides family ID resolution and blocking GENL request/response
/// exchanges. Family IDs are cached to avoid repeated kernel queries.
///
/// # Example
///
/// ```rust,no_run
/// use wgctrl::netlink::genl::GenlConnection;
///
/// # fn example() -> wgctrl::Result<()> {
/// let conn = GenlConnection::new()?;
/// let family = conn.get_family("wireguard")?;
/// println!("WireGuard family ID: {}", family.id);
/// # Ok(())
/// # }
/// ```
pub struct GenlConnection {
    socket: NetlinkSocket,
    cache: RwLock<HashMap<String, FamilyInfo>>,
}

impl GenlConnection {
    /// Create a new Generic Netlink connection.
    pub fn new() -> Result<Self> {
        Ok(Self::from_socket(NetlinkSocket::new(Protocol::Generic)?))
    }

    /// Create a GENL connection from an existing socket.
    ///
    /// The socket must be a `Protocol::Generic` socket.
    pub fn from_socket(socket: NetlinkSocket) -> Self {
        Self {
            socket,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the underlying socket.
    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }

    /// Get information about a Generic Netlink family.
    ///
    /// The result is cached, so subsequent calls for the same family
    /// do not require kernel communication.
    pub fn get_family(&self, name: &str) -> Result<FamilyInfo> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(info) = cache.get(name) {
                return Ok(info.clone());
            }
        }

        let info = self.query_family(name)?;
        tracing::debug!(
            family = name,
            id = info.id,
            version = info.version,
            "resolved generic netlink family"
        );

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), info.clone());

        Ok(info)
    }

    /// Get the family ID for a given family name.
    pub fn get_family_id(&self, name: &str) -> Result<u16> {
        Ok(self.get_family(name)?.id)
    }

    /// Query the kernel for family information.
    fn query_family(&self, name: &str) -> Result<FamilyInfo> {
        let mut builder = MessageBuilder::new(GENL_ID_CTRL, NLM_F_REQUEST | NLM_F_ACK);
        builder.append(&GenlMsgHdr::new(CtrlCmd::GetFamily as u8, 1));

        let mut attrs = AttrBuilder::new();
        attrs.append_attr_str(CtrlAttr::FamilyName as u16, name);
        builder.append_attrs(attrs.as_bytes());

        let seq = self.send(builder)?;
        let response = self.socket.recv_msg()?;
        parse_family_response(&response, seq, name)
    }

    /// Stamp and send a request, returning its sequence number.
    fn send(&self, mut builder: MessageBuilder) -> Result<u32> {
        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());
        self.socket.send(&builder.finish())?;
        Ok(seq)
    }

    /// Send a GENL command carrying `attrs` and wait for the kernel's ACK.
    pub fn command(&self, family_id: u16, cmd: u8, version: u8, attrs: &[u8]) -> Result<()> {
        let mut builder = MessageBuilder::new(family_id, NLM_F_REQUEST | NLM_F_ACK);
        builder.append(&GenlMsgHdr::new(cmd, version));
        builder.append_attrs(attrs);

        let seq = self.send(builder)?;

        loop {
            let data = self.socket.recv_msg()?;
            for result in MessageIter::new(&data) {
                let (header, payload) = result?;

                if header.nlmsg_seq != seq {
                    continue;
                }

                if header.is_error() {
                    return NlMsgError::from_bytes(payload)?.check();
                }
            }
        }
    }

    /// Send a GENL dump command and collect every reply.
    ///
    /// Each returned buffer is the attribute stream of one reply message,
    /// with the GENL header stripped, in the order the kernel sent them.
    pub fn dump_command(
        &self,
        family_id: u16,
        cmd: u8,
        version: u8,
        attrs: &[u8],
    ) -> Result<Vec<Vec<u8>>> {
        let mut builder = MessageBuilder::new(family_id, NLM_F_REQUEST | NLM_F_DUMP);
        builder.append(&GenlMsgHdr::new(cmd, version));
        builder.append_attrs(attrs);

        let seq = self.send(builder)?;
        let mut responses = Vec::new();

        loop {
            let data = self.socket.recv_msg()?;
            if collect_dump_replies(&data, seq, &mut responses)? {
                tracing::trace!(seq, replies = responses.len(), "dump complete");
                return Ok(responses);
            }
        }
    }
}

/// Append the GENL payloads of one received datagram to `responses`.
///
/// Returns `true` once `NLMSG_DONE` for `seq` is seen. A dump the kernel
/// flagged as interrupted is rejected: its replies may repeat or skip
/// entries.
fn collect_dump_replies(data: &[u8], seq: u32, responses: &mut Vec<Vec<u8>>) -> Result<bool> {
    for result in MessageIter::new(data) {
        let (header, payload) = result?;

        if header.nlmsg_seq != seq {
            continue;
        }

        if header.is_error() {
            NlMsgError::from_bytes(payload)?.check()?;
            continue;
        }

        if header.is_dump_interrupted() {
            tracing::debug!(seq, replies = responses.len(), "dump interrupted");
            return Err(Error::DumpInterrupted);
        }

        if header.is_done() {
            return Ok(true);
        }

        if payload.len() < GENL_HDRLEN {
            return Err(Error::Truncated {
                expected: GENL_HDRLEN,
                actual: payload.len(),
            });
        }
        responses.push(payload[GENL_HDRLEN..].to_vec());
    }
    Ok(false)
}

/// Parse a CTRL_CMD_GETFAMILY response.
fn parse_family_response(data: &[u8], seq: u32, name: &str) -> Result<FamilyInfo> {
    for result in MessageIter::new(data) {
        let (header, payload) = result?;

        if header.nlmsg_seq != seq {
            continue;
        }

        if header.is_error() {
            let err = NlMsgError::from_bytes(payload)?;
            if err.error == -libc::ENOENT {
                return Err(Error::FamilyNotFound {
                    name: name.to_string(),
                });
            }
            err.check()?;
            continue;
        }

        if header.is_done() {
            continue;
        }

        if payload.len() < GENL_HDRLEN {
            return Err(Error::InvalidMessage("GENL header too short".into()));
        }

        return parse_family_attrs(&payload[GENL_HDRLEN..]);
    }

    Err(Error::FamilyNotFound {
        name: name.to_string(),
    })
}

/// Parse family attributes from a CTRL_CMD_GETFAMILY response.
fn parse_family_attrs(data: &[u8]) -> Result<FamilyInfo> {
    let mut id: Option<u16> = None;
    let mut version: u8 = 0;

    for attr in AttrIter::new(data) {
        let (attr_type, payload) = attr?;
        match attr_type {
            t if t == CtrlAttr::FamilyId as u16 => {
                id = Some(get::u16_ne(payload, "family id")?);
            }
            t if t == CtrlAttr::Version as u16 => {
                version = get::u32_ne(payload, "family version")? as u8;
            }
            // Ops, multicast groups and policies are not needed here.
            _ => {}
        }
    }

    let id = id.ok_or_else(|| Error::InvalidMessage("missing family ID".into()))?;

    Ok(FamilyInfo { id, version })
}
