//! Reassembly of a device the kernel split across dump messages.
//!
//! A `WG_CMD_GET_DEVICE` dump repeats the device header in every message
//! and may cut the peer list anywhere, including in the middle of one
//! peer's allowed IPs. It never reopens a peer that an earlier message
//! already closed, so only the first peer of each message can continue
//! the previous one.

use super::parse::parse_device;
use super::types::Device;
use crate::netlink::Result;

/// Folds the reply messages of one dump into a single [`Device`].
///
/// Messages must be pushed in the order the kernel sent them.
///
/// ```
/// use wgctrl::wireguard::DeviceAssembler;
///
/// # fn example(replies: Vec<Vec<u8>>) -> wgctrl::Result<()> {
/// let mut assembler = DeviceAssembler::new();
/// for reply in &replies {
///     assembler.push_fragment(reply)?;
/// }
/// let device = assembler.finish();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DeviceAssembler {
    device: Device,
    fragments: usize,
}

impl DeviceAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fragments merged so far.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Decode one reply message and merge it into the device.
    ///
    /// On error the assembler should be discarded: the dump is unusable.
    pub fn push_fragment(&mut self, data: &[u8]) -> Result<()> {
        let fragment = parse_device(data)?;
        self.merge(fragment);
        Ok(())
    }

    /// Merge an already-decoded fragment.
    pub fn merge(&mut self, fragment: Device) {
        let acc = &mut self.device;

        // First writer wins; later fragments never blank a value.
        if acc.name.is_empty() {
            acc.name = fragment.name;
        }
        if acc.private_key.is_none() {
            acc.private_key = fragment.private_key;
        }
        if acc.public_key.is_none() {
            acc.public_key = fragment.public_key;
        }
        if acc.listen_port == 0 {
            acc.listen_port = fragment.listen_port;
        }
        if acc.firewall_mark == 0 {
            acc.firewall_mark = fragment.firewall_mark;
        }

        let mut peers = fragment.peers.into_iter();
        if let Some(first) = peers.next() {
            match acc.peers.last_mut() {
                Some(tail) if tail.public_key == first.public_key => {
                    tail.allowed_ips.extend(first.allowed_ips);
                }
                _ => acc.peers.push(first),
            }
        }
        acc.peers.extend(peers);

        self.fragments += 1;
    }

    /// Return the assembled device.
    pub fn finish(self) -> Device {
        self.device
    }
}

/// Decode and merge every reply message of one dump.
///
/// Returns `None` when there are no messages at all.
pub fn assemble<I, B>(fragments: I) -> Result<Option<Device>>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut assembler = DeviceAssembler::new();
    for fragment in fragments {
        assembler.push_fragment(fragment.as_ref())?;
    }
    if assembler.fragments() == 0 {
        return Ok(None);
    }
    Ok(Some(assembler.finish()))
}
