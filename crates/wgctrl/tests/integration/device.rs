//! Device query and configuration tests against the kernel module.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use wgctrl::Result;
use wgctrl::wireguard::{AllowedIp, Config, DeviceType, Key, PeerConfig};

/// A private key the kernel stores unchanged after clamping.
fn private_key() -> Key {
    Key::new([0x40; 32])
}

fn peer_key(n: u8) -> Key {
    let mut bytes = [0x11; 32];
    bytes[0] = n;
    Key::new(bytes)
}

#[test]
fn test_configure_roundtrip() -> Result<()> {
    require_root!();
    require_wireguard!(client, dev);

    let endpoint: SocketAddr = "127.0.0.1:51820".parse().unwrap();
    let config = Config::new()
        .private_key(private_key())
        .listen_port(41820)
        .firewall_mark(0x1234)
        .peer(
            PeerConfig::new(peer_key(1))
                .endpoint(endpoint)
                .persistent_keepalive_interval(Duration::from_secs(25))
                .allowed_ip(AllowedIp::v4(Ipv4Addr::new(10, 9, 0, 0), 16))
                .allowed_ip(AllowedIp::v6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 0), 64)),
        )
        .peer(PeerConfig::new(peer_key(2)).preshared_key(Key::new([7; 32])));

    client.configure_device(dev.name(), &config)?;

    let device = client.device_by_name(dev.name())?;
    assert_eq!(device.name, dev.name());
    assert_eq!(device.device_type, DeviceType::LinuxKernel);
    assert_eq!(device.private_key, Some(private_key()));
    assert!(device.public_key.is_some());
    assert_eq!(device.listen_port, 41820);
    assert_eq!(device.firewall_mark, 0x1234);
    assert_eq!(device.peers.len(), 2);

    let first = device.peer(&peer_key(1)).expect("first peer");
    assert_eq!(first.endpoint, Some(endpoint));
    assert_eq!(first.persistent_keepalive_interval, Duration::from_secs(25));
    assert_eq!(first.last_handshake_time, None);
    assert_eq!(first.allowed_ips.len(), 2);
    assert!(first.preshared_key.is_none());

    let second = device.peer(&peer_key(2)).expect("second peer");
    assert_eq!(second.preshared_key, Some(Key::new([7; 32])));
    assert!(second.endpoint.is_none());

    Ok(())
}

#[test]
fn test_devices_lists_new_link() -> Result<()> {
    require_root!();
    require_wireguard!(client, dev);

    let devices = client.devices()?;
    assert!(devices.iter().any(|d| d.name == dev.name()));
    Ok(())
}

#[test]
fn test_device_by_index() -> Result<()> {
    require_root!();
    require_wireguard!(client, dev);

    let device = client.device_by_index(dev.index()?)?;
    assert_eq!(device.name, dev.name());
    Ok(())
}

#[test]
fn test_large_allowed_ip_list() -> Result<()> {
    require_root!();
    require_wireguard!(client, dev);

    // Far more than one request or one dump message can hold.
    let ips: Vec<AllowedIp> = (0..3000u32)
        .map(|i| AllowedIp::v4(Ipv4Addr::from(0x0a00_0000 + i), 32))
        .collect();
    let config = Config::new()
        .peer(PeerConfig::new(peer_key(1)).allowed_ips(ips.iter().copied()))
        .peer(
            PeerConfig::new(peer_key(2))
                .allowed_ip(AllowedIp::v4(Ipv4Addr::new(192, 168, 0, 0), 24)),
        );

    client.configure_device(dev.name(), &config)?;

    let device = client.device_by_name(dev.name())?;
    assert_eq!(device.peers.len(), 2);

    let mut got = device.peer(&peer_key(1)).expect("peer").allowed_ips.clone();
    got.sort_by_key(|ip| ip.to_string());
    let mut want = ips;
    want.sort_by_key(|ip| ip.to_string());
    assert_eq!(got, want);
    Ok(())
}

#[test]
fn test_remove_peer() -> Result<()> {
    require_root!();
    require_wireguard!(client, dev);

    let config = Config::new()
        .peer(PeerConfig::new(peer_key(1)))
        .peer(PeerConfig::new(peer_key(2)));
    client.configure_device(dev.name(), &config)?;

    client.remove_peer(dev.name(), &peer_key(1))?;

    let device = client.device_by_name(dev.name())?;
    assert_eq!(device.peers.len(), 1);
    assert_eq!(device.peers[0].public_key, peer_key(2));
    Ok(())
}

#[test]
fn test_missing_device() -> Result<()> {
    require_root!();
    let Some(client) = crate::common::kernel_client()? else {
        return Ok(());
    };

    let err = client.device_by_name("wgt-missing0").unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
    Ok(())
}
