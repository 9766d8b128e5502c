//! Generic Netlink (GENL) support.
//!
//! Only the part of GENL the WireGuard family needs: the message header,
//! family-id resolution through the control family, and plain
//! command/dump exchanges.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ KernelTransport (wireguard family)      │
//! └────────────────┬────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────┐
//! │ GenlConnection                          │
//! │ (family cache, command, dump_command)   │
//! └────────────────┬────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────┐
//! │ NetlinkSocket (Protocol::Generic)       │
//! └─────────────────────────────────────────┘
//! ```

mod connection;
mod header;

pub use connection::{FamilyInfo, GenlConnection};
pub use header::{GENL_HDRLEN, GenlMsgHdr};

// Control family constants (fixed, not dynamically assigned)
pub const GENL_ID_CTRL: u16 = 0x10;

/// Control family commands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCmd {
    Unspec = 0,
    NewFamily = 1,
    GetFamily = 3,
}

/// Control family attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttr {
    Unspec = 0,
    FamilyId = 1,
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
}
