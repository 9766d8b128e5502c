//! Netlink message framing.
//!
//! A receive buffer holds one or more `nlmsghdr`-prefixed messages, each
//! padded to four bytes. Replies to our requests are either data
//! messages, `NLMSG_ERROR` (which doubles as the ACK when the error code
//! is zero) or the `NLMSG_DONE` that terminates a dump.

use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink message header alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Round `len` up to the message alignment.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type. For GENL this is the family id.
    pub nlmsg_type: u16,
    /// `NLM_F_*` flags.
    pub nlmsg_flags: u16,
    /// Sequence number, echoed by the kernel.
    pub nlmsg_seq: u32,
    /// Sending port id.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Header for a message with no payload yet.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            ..Default::default()
        }
    }

    /// `NLMSG_ERROR`, which also carries ACKs.
    pub fn is_error(&self) -> bool {
        self.nlmsg_type == NlMsgType::ERROR
    }

    /// `NLMSG_DONE`, the end of a dump.
    pub fn is_done(&self) -> bool {
        self.nlmsg_type == NlMsgType::DONE
    }

    /// The kernel restarted the dump and its contents may be inconsistent.
    pub fn is_dump_interrupted(&self) -> bool {
        self.nlmsg_flags & NLM_F_DUMP_INTR != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Message types shared by every netlink protocol, plus the two
/// RTNetlink link types used for interface discovery.
pub struct NlMsgType;

impl NlMsgType {
    pub const ERROR: u16 = 2;
    pub const DONE: u16 = 3;

    pub const RTM_NEWLINK: u16 = 16;
    pub const RTM_GETLINK: u16 = 18;
}

pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_DUMP_INTR: u16 = 0x10;
/// `NLM_F_ROOT | NLM_F_MATCH`.
pub const NLM_F_DUMP: u16 = 0x300;

/// Iterator over the messages packed into one receive buffer.
///
/// Yields `(header, payload)` pairs. A header whose length runs past the
/// buffer yields one error and ends the iteration, since nothing after
/// it can be framed.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(&'a NlMsgHdr, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLMSG_HDRLEN {
            return None;
        }

        let data = std::mem::take(&mut self.data);
        let header = match NlMsgHdr::from_bytes(data) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };

        let len = header.nlmsg_len as usize;
        if !(NLMSG_HDRLEN..=data.len()).contains(&len) {
            return Some(Err(Error::InvalidMessage(format!(
                "message length {} outside {}..={}",
                len,
                NLMSG_HDRLEN,
                data.len()
            ))));
        }

        self.data = data.get(nlmsg_align(len)..).unwrap_or_default();
        Some(Ok((header, &data[NLMSG_HDRLEN..len])))
    }
}

/// Payload of an `NLMSG_ERROR` message.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Negative errno, or 0 for an ACK.
    pub error: i32,
    /// Header of the request being answered.
    pub msg: NlMsgHdr,
}

impl NlMsgError {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// `Ok` for an ACK, the kernel error otherwise.
    pub fn check(&self) -> Result<()> {
        if self.is_ack() {
            Ok(())
        } else {
            Err(Error::from_errno(self.error))
        }
    }
}
