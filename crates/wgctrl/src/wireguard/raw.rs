//! Fixed-layout kernel structures carried inside attributes.
//!
//! Endpoints travel as `struct sockaddr_in` / `struct sockaddr_in6` and
//! handshake times as `struct timespec` (or `__kernel_timespec`). Both are
//! decoded field by field with explicit length checks rather than by
//! overlaying the kernel layout on the buffer.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::netlink::{Error, Result};

/// Size of `struct sockaddr_in`.
pub const SOCKADDR_IN_LEN: usize = 16;
/// Size of `struct sockaddr_in6`.
pub const SOCKADDR_IN6_LEN: usize = 28;

const NSEC_PER_SEC: i64 = 1_000_000_000;

/// Decode an endpoint. The payload length selects the address family.
///
/// IPv6 flow info and scope id are not carried over.
pub fn parse_sockaddr(data: &[u8]) -> Result<SocketAddr> {
    match data.len() {
        SOCKADDR_IN_LEN => {
            check_family(data, libc::AF_INET)?;
            let port = u16::from_be_bytes([data[2], data[3]]);
            let ip = Ipv4Addr::new(data[4], data[5], data[6], data[7]);
            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }
        SOCKADDR_IN6_LEN => {
            check_family(data, libc::AF_INET6)?;
            let port = u16::from_be_bytes([data[2], data[3]]);
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&data[8..24]);
            let ip = Ipv6Addr::from(octets);
            Ok(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)))
        }
        n => Err(Error::malformed(
            "peer endpoint",
            format!("expected {} or {} bytes, got {}", SOCKADDR_IN_LEN, SOCKADDR_IN6_LEN, n),
        )),
    }
}

fn check_family(data: &[u8], expected: libc::c_int) -> Result<()> {
    let family = u16::from_ne_bytes([data[0], data[1]]);
    if family != expected as u16 {
        return Err(Error::malformed(
            "peer endpoint",
            format!("address family {} does not match length {}", family, data.len()),
        ));
    }
    Ok(())
}

/// Encode an endpoint as `sockaddr_in` (16 bytes) or `sockaddr_in6` (28 bytes).
pub fn sockaddr_to_bytes(addr: &SocketAddr) -> Vec<u8> {
    match addr {
        SocketAddr::V4(v4) => {
            let mut buf = vec![0u8; SOCKADDR_IN_LEN];
            buf[0..2].copy_from_slice(&(libc::AF_INET as u16).to_ne_bytes());
            buf[2..4].copy_from_slice(&v4.port().to_be_bytes());
            buf[4..8].copy_from_slice(&v4.ip().octets());
            buf
        }
        SocketAddr::V6(v6) => {
            let mut buf = vec![0u8; SOCKADDR_IN6_LEN];
            buf[0..2].copy_from_slice(&(libc::AF_INET6 as u16).to_ne_bytes());
            buf[2..4].copy_from_slice(&v6.port().to_be_bytes());
            buf[8..24].copy_from_slice(&v6.ip().octets());
            buf
        }
    }
}

/// Word width of a timestamp pair on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimespecWidth {
    /// Two 32-bit words (8 bytes).
    Bits32,
    /// Two 64-bit words (16 bytes).
    Bits64,
}

impl TimespecWidth {
    /// Payload size for this width.
    pub const fn size(self) -> usize {
        match self {
            Self::Bits32 => 8,
            Self::Bits64 => 16,
        }
    }

    /// Width matching the running platform's `struct timespec`.
    pub const fn native() -> Self {
        if std::mem::size_of::<libc::time_t>() == 8 {
            Self::Bits64
        } else {
            Self::Bits32
        }
    }
}

/// Decode a `(seconds, nanoseconds)` pair.
///
/// The width is taken from the payload length so a reply produced on a
/// platform with a different word size still decodes. `(0, 0)` means the
/// event never happened and decodes to `None`.
pub fn parse_timespec(data: &[u8]) -> Result<Option<SystemTime>> {
    let (secs, nsecs) = match data.len() {
        8 => (
            i32::from_ne_bytes([data[0], data[1], data[2], data[3]]) as i64,
            i32::from_ne_bytes([data[4], data[5], data[6], data[7]]) as i64,
        ),
        16 => {
            let mut secs = [0u8; 8];
            let mut nsecs = [0u8; 8];
            secs.copy_from_slice(&data[0..8]);
            nsecs.copy_from_slice(&data[8..16]);
            (i64::from_ne_bytes(secs), i64::from_ne_bytes(nsecs))
        }
        n => {
            return Err(Error::malformed(
                "peer last handshake",
                format!("expected 8 or 16 bytes, got {}", n),
            ));
        }
    };

    if secs == 0 && nsecs == 0 {
        return Ok(None); // No handshake yet
    }

    if !(0..NSEC_PER_SEC).contains(&nsecs) {
        return Err(Error::malformed(
            "peer last handshake",
            format!("nanoseconds {} out of range", nsecs),
        ));
    }

    let subsec = Duration::from_nanos(nsecs as u64);
    let time = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64) + subsec)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(secs.unsigned_abs()))
            .and_then(|t| t.checked_add(subsec))
    };

    time.map(Some).ok_or_else(|| {
        Error::malformed("peer last handshake", format!("seconds {} out of range", secs))
    })
}

/// Encode a timestamp pair with the given word width. `None` encodes as `(0, 0)`.
///
/// Values that do not fit the width are an [`Error::InvalidConfig`].
pub fn timespec_to_bytes(time: Option<SystemTime>, width: TimespecWidth) -> Result<Vec<u8>> {
    let (secs, nsecs) = match time {
        None => (0i64, 0i64),
        Some(t) => match t.duration_since(UNIX_EPOCH) {
            Ok(d) => (
                i64::try_from(d.as_secs())
                    .map_err(|_| Error::InvalidConfig("timestamp out of range".into()))?,
                d.subsec_nanos() as i64,
            ),
            Err(e) => {
                // Before the epoch: borrow a second so nanoseconds stay positive.
                let d = e.duration();
                let mut secs = -i64::try_from(d.as_secs())
                    .map_err(|_| Error::InvalidConfig("timestamp out of range".into()))?;
                let mut nsecs = d.subsec_nanos() as i64;
                if nsecs > 0 {
                    secs -= 1;
                    nsecs = NSEC_PER_SEC - nsecs;
                }
                (secs, nsecs)
            }
        },
    };

    match width {
        TimespecWidth::Bits64 => {
            let mut buf = Vec::with_capacity(16);
            buf.extend_from_slice(&secs.to_ne_bytes());
            buf.extend_from_slice(&nsecs.to_ne_bytes());
            Ok(buf)
        }
        TimespecWidth::Bits32 => {
            let secs = i32::try_from(secs).map_err(|_| {
                Error::InvalidConfig(format!("seconds {} do not fit 32 bits", secs))
            })?;
            let mut buf = Vec::with_capacity(8);
            buf.extend_from_slice(&secs.to_ne_bytes());
            buf.extend_from_slice(&(nsecs as i32).to_ne_bytes());
            Ok(buf)
        }
    }
}
