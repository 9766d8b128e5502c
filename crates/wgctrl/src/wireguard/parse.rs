//! Attribute tree → typed record decoding.
//!
//! Unknown attribute types are skipped so newer kernels keep working.
//! Known fixed-size attributes must have their exact width; anything else
//! aborts the decode with [`Error::MalformedField`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use super::key::{Key, WG_KEY_LEN};
use super::raw::{parse_sockaddr, parse_timespec};
use super::types::{AllowedIp, Device, Peer};
use super::{WgAllowedIpAttr, WgDeviceAttr, WgPeerAttr};
use crate::netlink::attr::{AttrIter, get};
use crate::netlink::{Error, Result};

/// Decode one `WG_CMD_GET_DEVICE` reply into a device.
///
/// A reply is usually only a fragment of the device: the kernel splits
/// large peer lists across messages. Use
/// [`DeviceAssembler`](super::DeviceAssembler) to combine them. The
/// interface index is validated but not kept, and `device_type` is left
/// at its default.
pub fn parse_device(data: &[u8]) -> Result<Device> {
    let mut device = Device::default();

    for attr in AttrIter::new(data) {
        let (attr_type, payload) = attr?;
        match attr_type {
            t if t == WgDeviceAttr::Ifindex as u16 => {
                get::u32_ne(payload, "device ifindex")?;
            }
            t if t == WgDeviceAttr::Ifname as u16 => {
                device.name = get::string(payload, "device name")?.to_string();
            }
            t if t == WgDeviceAttr::PrivateKey as u16 => {
                device.private_key = optional_key(payload, "device private key")?;
            }
            t if t == WgDeviceAttr::PublicKey as u16 => {
                device.public_key = optional_key(payload, "device public key")?;
            }
            t if t == WgDeviceAttr::ListenPort as u16 => {
                device.listen_port = get::u16_ne(payload, "device listen port")?;
            }
            t if t == WgDeviceAttr::Fwmark as u16 => {
                device.firewall_mark = get::u32_ne(payload, "device firewall mark")?;
            }
            t if t == WgDeviceAttr::Peers as u16 => {
                for peer_attr in AttrIter::new(payload) {
                    // The outer type is only an index.
                    let (_, peer_data) = peer_attr?;
                    device.peers.push(parse_peer(peer_data)?);
                }
            }
            _ => {}
        }
    }

    Ok(device)
}

/// Decode one peer container.
pub fn parse_peer(data: &[u8]) -> Result<Peer> {
    let mut peer = Peer::default();

    for attr in AttrIter::new(data) {
        let (attr_type, payload) = attr?;
        match attr_type {
            t if t == WgPeerAttr::PublicKey as u16 => {
                peer.public_key = Key::new(get::array::<WG_KEY_LEN>(payload, "peer public key")?);
            }
            t if t == WgPeerAttr::PresharedKey as u16 => {
                peer.preshared_key = optional_key(payload, "peer preshared key")?;
            }
            t if t == WgPeerAttr::Endpoint as u16 => {
                peer.endpoint = Some(parse_sockaddr(payload)?);
            }
            t if t == WgPeerAttr::PersistentKeepalive as u16 => {
                let secs = get::u16_ne(payload, "peer persistent keepalive")?;
                peer.persistent_keepalive_interval = Duration::from_secs(secs as u64);
            }
            t if t == WgPeerAttr::LastHandshake as u16 => {
                peer.last_handshake_time = parse_timespec(payload)?;
            }
            t if t == WgPeerAttr::RxBytes as u16 => {
                peer.receive_bytes = get::u64_ne(payload, "peer rx bytes")?;
            }
            t if t == WgPeerAttr::TxBytes as u16 => {
                peer.transmit_bytes = get::u64_ne(payload, "peer tx bytes")?;
            }
            t if t == WgPeerAttr::AllowedIps as u16 => {
                for ip_attr in AttrIter::new(payload) {
                    let (_, ip_data) = ip_attr?;
                    peer.allowed_ips.push(parse_allowed_ip(ip_data)?);
                }
            }
            t if t == WgPeerAttr::ProtocolVersion as u16 => {
                peer.protocol_version = get::u32_ne(payload, "peer protocol version")?;
            }
            _ => {}
        }
    }

    Ok(peer)
}

/// Decode one allowed-IP container.
///
/// The address is required. The family, when present, must agree with
/// the address length. A missing prefix length decodes as 0.
pub fn parse_allowed_ip(data: &[u8]) -> Result<AllowedIp> {
    let mut family: Option<u16> = None;
    let mut addr: Option<IpAddr> = None;
    let mut cidr: u8 = 0;

    for attr in AttrIter::new(data) {
        let (attr_type, payload) = attr?;
        match attr_type {
            t if t == WgAllowedIpAttr::Family as u16 => {
                family = Some(get::u16_ne(payload, "allowed ip family")?);
            }
            t if t == WgAllowedIpAttr::IpAddr as u16 => {
                addr = Some(match payload.len() {
                    4 => IpAddr::V4(Ipv4Addr::from(get::array::<4>(payload, "allowed ip address")?)),
                    16 => {
                        IpAddr::V6(Ipv6Addr::from(get::array::<16>(payload, "allowed ip address")?))
                    }
                    n => {
                        return Err(Error::malformed(
                            "allowed ip address",
                            format!("expected 4 or 16 bytes, got {}", n),
                        ));
                    }
                });
            }
            t if t == WgAllowedIpAttr::CidrMask as u16 => {
                cidr = get::u8(payload, "allowed ip cidr mask")?;
            }
            _ => {}
        }
    }

    let addr = addr.ok_or_else(|| Error::malformed("allowed ip address", "missing"))?;
    let ip = AllowedIp { addr, cidr };

    if let Some(family) = family {
        if family != ip.family() {
            return Err(Error::malformed(
                "allowed ip family",
                format!("family {} does not match address {}", family, addr),
            ));
        }
    }

    if cidr > ip.max_cidr() {
        return Err(Error::malformed(
            "allowed ip cidr mask",
            format!("{} exceeds {}", cidr, ip.max_cidr()),
        ));
    }

    Ok(ip)
}

/// Decode a key, mapping the all-zero key to `None`.
fn optional_key(data: &[u8], attr: &'static str) -> Result<Option<Key>> {
    let key = Key::new(get::array::<WG_KEY_LEN>(data, attr)?);
    Ok((!key.is_zero()).then_some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::builder::AttrBuilder;
    use crate::wireguard::raw::{TimespecWidth, sockaddr_to_bytes, timespec_to_bytes};
    use std::time::UNIX_EPOCH;

    fn allowed_ip_attrs(family: Option<u16>, addr: &[u8], cidr: Option<u8>) -> AttrBuilder {
        let mut b = AttrBuilder::new();
        if let Some(family) = family {
            b.append_attr_u16(WgAllowedIpAttr::Family as u16, family);
        }
        b.append_attr(WgAllowedIpAttr::IpAddr as u16, addr);
        if let Some(cidr) = cidr {
            b.append_attr_u8(WgAllowedIpAttr::CidrMask as u16, cidr);
        }
        b
    }

    #[test]
    fn test_parse_device_scalars() {
        let mut b = AttrBuilder::new();
        b.append_attr_u32(WgDeviceAttr::Ifindex as u16, 5);
        b.append_attr_str(WgDeviceAttr::Ifname as u16, "wg0");
        b.append_attr(WgDeviceAttr::PrivateKey as u16, &[1u8; 32]);
        b.append_attr(WgDeviceAttr::PublicKey as u16, &[2u8; 32]);
        b.append_attr_u16(WgDeviceAttr::ListenPort as u16, 51820);
        b.append_attr_u32(WgDeviceAttr::Fwmark as u16, 0x10);
        b.append_attr_u32(99, 7); // unknown

        let device = parse_device(b.as_bytes()).unwrap();
        assert_eq!(device.name, "wg0");
        assert_eq!(device.private_key, Some(Key::new([1u8; 32])));
        assert_eq!(device.public_key, Some(Key::new([2u8; 32])));
        assert_eq!(device.listen_port, 51820);
        assert_eq!(device.firewall_mark, 0x10);
        assert!(device.peers.is_empty());
    }

    #[test]
    fn test_parse_device_zero_keys_are_absent() {
        let mut b = AttrBuilder::new();
        b.append_attr(WgDeviceAttr::PrivateKey as u16, &[0u8; 32]);
        b.append_attr(WgDeviceAttr::PublicKey as u16, &[0u8; 32]);
        let device = parse_device(b.as_bytes()).unwrap();
        assert!(device.private_key.is_none());
        assert!(device.public_key.is_none());
    }

    #[test]
    fn test_parse_device_wrong_width() {
        let mut b = AttrBuilder::new();
        b.append_attr_u32(WgDeviceAttr::ListenPort as u16, 51820);
        let err = parse_device(b.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedField { attr: "device listen port", .. }));

        let mut b = AttrBuilder::new();
        b.append_attr(WgDeviceAttr::PublicKey as u16, &[2u8; 31]);
        assert!(parse_device(b.as_bytes()).unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_peer() {
        let endpoint = "[fd00::2]:51820".parse().unwrap();
        let handshake = UNIX_EPOCH + std::time::Duration::new(10, 20);

        let mut ips = AttrBuilder::new();
        ips.append_nested(
            0,
            &allowed_ip_attrs(Some(libc::AF_INET as u16), &[10, 0, 0, 0], Some(24)),
        );
        ips.append_nested(1, &allowed_ip_attrs(None, &[0xfd; 16], Some(64)));

        let mut b = AttrBuilder::new();
        b.append_attr(WgPeerAttr::PublicKey as u16, &[3u8; 32]);
        b.append_attr(WgPeerAttr::PresharedKey as u16, &[0u8; 32]);
        b.append_attr(WgPeerAttr::Endpoint as u16, &sockaddr_to_bytes(&endpoint));
        b.append_attr_u16(WgPeerAttr::PersistentKeepalive as u16, 25);
        b.append_attr(
            WgPeerAttr::LastHandshake as u16,
            &timespec_to_bytes(Some(handshake), TimespecWidth::Bits64).unwrap(),
        );
        b.append_attr_u64(WgPeerAttr::RxBytes as u16, 1024);
        b.append_attr_u64(WgPeerAttr::TxBytes as u16, 2048);
        b.append_nested(WgPeerAttr::AllowedIps as u16, &ips);
        b.append_attr_u32(WgPeerAttr::ProtocolVersion as u16, 1);

        let peer = parse_peer(b.as_bytes()).unwrap();
        assert_eq!(peer.public_key, Key::new([3u8; 32]));
        assert!(peer.preshared_key.is_none());
        assert_eq!(peer.endpoint, Some(endpoint));
        assert_eq!(peer.persistent_keepalive_interval, Duration::from_secs(25));
        assert_eq!(peer.last_handshake_time, Some(handshake));
        assert_eq!(peer.receive_bytes, 1024);
        assert_eq!(peer.transmit_bytes, 2048);
        assert_eq!(peer.protocol_version, 1);
        assert_eq!(
            peer.allowed_ips,
            vec![
                AllowedIp::v4(Ipv4Addr::new(10, 0, 0, 0), 24),
                AllowedIp::v6(Ipv6Addr::from([0xfd; 16]), 64),
            ]
        );
    }

    #[test]
    fn test_parse_allowed_ip_default_mask() {
        let ip = parse_allowed_ip(allowed_ip_attrs(None, &[192, 168, 0, 0], None).as_bytes())
            .unwrap();
        assert_eq!(ip, AllowedIp::v4(Ipv4Addr::new(192, 168, 0, 0), 0));
    }

    #[test]
    fn test_parse_allowed_ip_rejects() {
        // family disagrees with address length
        let b = allowed_ip_attrs(Some(libc::AF_INET6 as u16), &[10, 0, 0, 0], Some(8));
        assert!(matches!(
            parse_allowed_ip(b.as_bytes()),
            Err(Error::MalformedField { attr: "allowed ip family", .. })
        ));

        // mask wider than the family
        let b = allowed_ip_attrs(None, &[10, 0, 0, 0], Some(33));
        assert!(parse_allowed_ip(b.as_bytes()).unwrap_err().is_malformed());

        // address of neither length
        let b = allowed_ip_attrs(None, &[10, 0, 0], Some(8));
        assert!(parse_allowed_ip(b.as_bytes()).unwrap_err().is_malformed());

        // no address at all
        let mut b = AttrBuilder::new();
        b.append_attr_u8(WgAllowedIpAttr::CidrMask as u16, 8);
        assert!(parse_allowed_ip(b.as_bytes()).unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_truncated_nested_peer() {
        let mut peer = AttrBuilder::new();
        peer.append_attr(WgPeerAttr::PublicKey as u16, &[3u8; 32]);
        let mut bytes = peer.finish();
        // Claim more payload than the container holds.
        bytes[0..2].copy_from_slice(&64u16.to_ne_bytes());

        let mut peers = AttrBuilder::new();
        peers.append_attr(0, &bytes);
        let mut b = AttrBuilder::new();
        b.append_nested(WgDeviceAttr::Peers as u16, &peers);

        assert!(parse_device(b.as_bytes()).unwrap_err().is_malformed());
    }
}
