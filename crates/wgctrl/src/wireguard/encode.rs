//! [`Config`] → `WG_CMD_SET_DEVICE` attribute streams.
//!
//! A configuration with many peers or allowed IPs may not fit in one
//! netlink message. [`encode_batches`] splits it into an ordered list of
//! requests that, applied in sequence, have the same effect as the whole
//! configuration applied at once:
//!
//! - device scalars and `WGDEVICE_F_REPLACE_PEERS` go in the first request
//!   only, so later requests add to the peer list instead of resetting it;
//! - peers are packed greedily in order, and a peer that lands whole in a
//!   later request keeps all its fields and flags;
//! - a peer too large for any request has its allowed IPs split over
//!   consecutive requests. Its scalars, `WGPEER_F_REMOVE_ME` and
//!   `WGPEER_F_REPLACE_ALLOWEDIPS` ride on the first chunk only;
//!   `WGPEER_F_UPDATE_ONLY` rides on every chunk.

use super::config::{Config, PeerConfig};
use super::raw::sockaddr_to_bytes;
use super::types::AllowedIp;
use super::{WgAllowedIpAttr, WgDeviceAttr, WgDeviceFlag, WgPeerAttr, WgPeerFlag};
use crate::netlink::InterfaceRef;
use crate::netlink::attr::{NLA_HDRLEN, nla_size};
use crate::netlink::builder::AttrBuilder;
use crate::netlink::{Error, Result};

/// Largest attribute stream a single nested attribute length can describe.
const MAX_NESTED_PAYLOAD: usize = u16::MAX as usize;

/// Encode a configuration as one request.
///
/// Fails with [`Error::InvalidConfig`] if the configuration needs more
/// than one message; use [`encode_batches`] for those.
pub fn encode_device(target: &InterfaceRef, config: &Config) -> Result<Vec<u8>> {
    let mut batches = encode_batches(target, config, MAX_NESTED_PAYLOAD)?;
    if batches.len() != 1 {
        return Err(Error::InvalidConfig(format!(
            "configuration needs {} requests",
            batches.len()
        )));
    }
    Ok(batches.remove(0))
}

/// Encode a configuration as one or more requests of at most
/// `max_payload` attribute bytes each.
///
/// Every request names the target device. An empty configuration still
/// yields one request.
pub fn encode_batches(
    target: &InterfaceRef,
    config: &Config,
    max_payload: usize,
) -> Result<Vec<Vec<u8>>> {
    let mut writer = BatchWriter::new(target, config, max_payload.min(MAX_NESTED_PAYLOAD))?;

    for peer in &config.peers {
        writer.push_peer(peer)?;
    }

    Ok(writer.finish())
}

/// Greedy packer for peer containers.
struct BatchWriter<'a> {
    target: &'a InterfaceRef,
    max: usize,
    /// Device-level attributes of the batch being built.
    header: AttrBuilder,
    /// Peer containers (inner attributes) of the batch being built.
    peers: Vec<AttrBuilder>,
    /// Bytes used by `peers`, excluding the `WGDEVICE_A_PEERS` header.
    peers_len: usize,
    /// Length of a header that only names the device.
    bare_len: usize,
    batches: Vec<Vec<u8>>,
}

impl<'a> BatchWriter<'a> {
    fn new(target: &'a InterfaceRef, config: &Config, max: usize) -> Result<Self> {
        let mut header = target_attrs(target);
        let bare_len = header.len();

        let mut flags = 0u32;
        if config.replace_peers {
            flags |= WgDeviceFlag::ReplacePeers as u32;
        }
        if flags != 0 {
            header.append_attr_u32(WgDeviceAttr::Flags as u16, flags);
        }
        if let Some(key) = &config.private_key {
            header.append_attr(WgDeviceAttr::PrivateKey as u16, key.as_bytes());
        }
        if let Some(port) = config.listen_port {
            header.append_attr_u16(WgDeviceAttr::ListenPort as u16, port);
        }
        if let Some(mark) = config.firewall_mark {
            header.append_attr_u32(WgDeviceAttr::Fwmark as u16, mark);
        }

        if header.len() > max {
            return Err(Error::InvalidConfig(format!(
                "device attributes need {} bytes, limit is {}",
                header.len(),
                max
            )));
        }

        Ok(Self {
            target,
            max,
            header,
            peers: Vec::new(),
            peers_len: 0,
            bare_len,
            batches: Vec::new(),
        })
    }

    /// Check whether a peer container of `size` bytes fits the current batch.
    fn fits(&self, size: usize) -> bool {
        // NLA_HDRLEN for the WGDEVICE_A_PEERS container itself.
        self.header.len() + NLA_HDRLEN + self.peers_len + size <= self.max
    }

    /// The current batch names the device and carries nothing else.
    fn is_bare(&self) -> bool {
        self.peers.is_empty() && self.header.len() == self.bare_len
    }

    fn add(&mut self, peer: AttrBuilder) {
        self.peers_len += nla_size(peer.len());
        self.peers.push(peer);
    }

    fn push_peer(&mut self, peer: &PeerConfig) -> Result<()> {
        // The kernel ignores everything but the key on a removed peer, and
        // splitting one would re-create it from the second chunk on.
        let ips: &[AllowedIp] = if peer.remove { &[] } else { &peer.allowed_ips };
        for ip in ips {
            validate_allowed_ip(ip)?;
        }

        let mut whole = peer_attrs(peer, true)?;
        append_allowed_ips(&mut whole, ips);
        let whole_size = nla_size(whole.len());

        if self.fits(whole_size) {
            self.add(whole);
            return Ok(());
        }
        // Peers or device scalars already take room: retry in a fresh batch.
        if !self.is_bare() {
            self.flush();
            if self.fits(whole_size) {
                self.add(whole);
                return Ok(());
            }
        }

        // Alone in a bare batch and still too large: split its allowed IPs.
        let sizes: Vec<usize> = ips
            .iter()
            .map(|ip| nla_size(allowed_ip_attrs(ip).len()))
            .collect();
        let mut start = 0;
        let mut first = true;

        loop {
            let mut chunk = peer_attrs(peer, first)?;
            let mut size = NLA_HDRLEN + chunk.len() + NLA_HDRLEN;
            let mut end = start;
            while end < ips.len() && self.fits(size + sizes[end]) {
                size += sizes[end];
                end += 1;
            }
            if end == start {
                return Err(Error::InvalidConfig(format!(
                    "peer {} does not fit in a {} byte request",
                    peer.public_key, self.max
                )));
            }

            append_allowed_ips(&mut chunk, &ips[start..end]);
            self.add(chunk);
            start = end;
            first = false;

            if start == ips.len() {
                return Ok(());
            }
            self.flush();
        }
    }

    /// Close the current batch and start a new one that only names the device.
    fn flush(&mut self) {
        let mut attrs = std::mem::replace(&mut self.header, target_attrs(self.target));

        if !self.peers.is_empty() {
            let token = attrs.nest_start(WgDeviceAttr::Peers as u16);
            for (idx, peer) in self.peers.drain(..).enumerate() {
                attrs.append_nested(idx as u16, &peer);
            }
            attrs.nest_end(token);
        }

        self.peers_len = 0;
        self.batches.push(attrs.finish());
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        if !self.peers.is_empty() || self.batches.is_empty() {
            self.flush();
        }
        self.batches
    }
}

/// Attributes naming the target device.
pub(crate) fn target_attrs(target: &InterfaceRef) -> AttrBuilder {
    let mut attrs = AttrBuilder::new();
    match target {
        InterfaceRef::Name(name) => attrs.append_attr_str(WgDeviceAttr::Ifname as u16, name),
        InterfaceRef::Index(index) => attrs.append_attr_u32(WgDeviceAttr::Ifindex as u16, *index),
    }
    attrs
}

/// Encode a peer's key, flags and (on the first chunk) scalar fields.
fn peer_attrs(peer: &PeerConfig, first_chunk: bool) -> Result<AttrBuilder> {
    let mut attrs = AttrBuilder::new();
    attrs.append_attr(WgPeerAttr::PublicKey as u16, peer.public_key.as_bytes());

    let mut flags = 0u32;
    if peer.update_only {
        flags |= WgPeerFlag::UpdateOnly as u32;
    }
    if first_chunk {
        if peer.remove {
            flags |= WgPeerFlag::RemoveMe as u32;
        }
        if peer.replace_allowed_ips {
            flags |= WgPeerFlag::ReplaceAllowedIps as u32;
        }
    }
    if flags != 0 {
        attrs.append_attr_u32(WgPeerAttr::Flags as u16, flags);
    }

    if !first_chunk {
        return Ok(attrs);
    }

    if let Some(psk) = &peer.preshared_key {
        attrs.append_attr(WgPeerAttr::PresharedKey as u16, psk.as_bytes());
    }
    if let Some(endpoint) = &peer.endpoint {
        attrs.append_attr(WgPeerAttr::Endpoint as u16, &sockaddr_to_bytes(endpoint));
    }
    if let Some(interval) = peer.persistent_keepalive_interval {
        let secs = u16::try_from(interval.as_secs()).map_err(|_| {
            Error::InvalidConfig(format!(
                "persistent keepalive interval {}s exceeds {}s",
                interval.as_secs(),
                u16::MAX
            ))
        })?;
        attrs.append_attr_u16(WgPeerAttr::PersistentKeepalive as u16, secs);
    }

    Ok(attrs)
}

fn allowed_ip_attrs(ip: &AllowedIp) -> AttrBuilder {
    let mut attrs = AttrBuilder::new();
    attrs.append_attr_u16(WgAllowedIpAttr::Family as u16, ip.family());
    attrs.append_attr(WgAllowedIpAttr::IpAddr as u16, &ip.addr_bytes());
    attrs.append_attr_u8(WgAllowedIpAttr::CidrMask as u16, ip.cidr);
    attrs
}

fn append_allowed_ips(attrs: &mut AttrBuilder, ips: &[AllowedIp]) {
    if ips.is_empty() {
        return;
    }
    let token = attrs.nest_start(WgPeerAttr::AllowedIps as u16);
    for (idx, ip) in ips.iter().enumerate() {
        attrs.append_nested(idx as u16, &allowed_ip_attrs(ip));
    }
    attrs.nest_end(token);
}

fn validate_allowed_ip(ip: &AllowedIp) -> Result<()> {
    if ip.cidr > ip.max_cidr() {
        return Err(Error::InvalidConfig(format!(
            "allowed ip {} has a prefix longer than {}",
            ip,
            ip.max_cidr()
        )));
    }
    Ok(())
}
