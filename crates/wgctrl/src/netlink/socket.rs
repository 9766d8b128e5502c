//! Low-level blocking netlink socket operations.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};

use super::error::Result;

/// Default receive buffer size; large enough for one kernel dump batch.
pub const DEFAULT_RECV_BUF: usize = 32768;

/// Netlink protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Routing/device hook, used for interface enumeration.
    Route,
    /// Generic netlink
    Generic,
}

impl Protocol {
    fn as_isize(self) -> isize {
        match self {
            Protocol::Route => protocols::NETLINK_ROUTE,
            Protocol::Generic => protocols::NETLINK_GENERIC,
        }
    }
}

/// Blocking netlink socket.
///
/// Every call blocks the calling thread until the kernel answers. Callers
/// sharing one socket must serialise request/response exchanges.
pub struct NetlinkSocket {
    socket: Socket,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
    /// Protocol this socket uses.
    protocol: Protocol,
    /// Capacity of each receive buffer.
    recv_buf: usize,
}

impl NetlinkSocket {
    /// Create a new netlink socket for the given protocol.
    pub fn new(protocol: Protocol) -> Result<Self> {
        Self::with_recv_buf(protocol, DEFAULT_RECV_BUF)
    }

    /// Create a socket whose reads use buffers of `recv_buf` bytes.
    pub fn with_recv_buf(protocol: Protocol, recv_buf: usize) -> Result<Self> {
        let mut socket = Socket::new(protocol.as_isize())?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Enable extended ACK for better error messages
        socket.set_ext_ack(true).ok(); // Ignore if not supported

        tracing::trace!(?protocol, pid, "opened netlink socket");

        Ok(Self {
            socket,
            seq: AtomicU32::new(1),
            pid,
            protocol,
            recv_buf,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Send a message.
    pub fn send(&self, msg: &[u8]) -> Result<()> {
        let n = self.socket.send(msg, 0)?;
        tracing::trace!(len = msg.len(), sent = n, "netlink send");
        Ok(())
    }

    /// Receive one datagram, allocating a buffer.
    ///
    /// A datagram may carry several netlink messages.
    pub fn recv_msg(&self) -> Result<Vec<u8>> {
        // Allocate buffer with capacity - don't resize, let recv fill it
        let mut buf = BytesMut::with_capacity(self.recv_buf);
        let n = self.socket.recv(&mut buf, 0)?;
        tracing::trace!(len = n, "netlink recv");
        // buf has been advanced by recv, so buf[..] contains the data
        Ok(buf.to_vec())
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
