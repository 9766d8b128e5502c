//! Common test utilities for integration tests.
//!
//! Provides `TestDevice` for a throwaway WireGuard interface and helper
//! macros for conditional test execution.

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use wgctrl::Result;
use wgctrl::wireguard::Client;

/// Global counter for unique interface names.
static DEVICE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique interface name (at most 15 bytes) for this test.
fn unique_device_name() -> String {
    let id = DEVICE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id() % 100_000;
    format!("wgt{}x{}", pid, id)
}

/// A WireGuard interface that is deleted when dropped.
pub struct TestDevice {
    name: String,
}

impl TestDevice {
    /// Create a new WireGuard interface with a unique name.
    ///
    /// Returns `Ok(None)` when the kernel cannot create WireGuard links
    /// (module missing), so callers can skip.
    pub fn new() -> Result<Option<Self>> {
        let name = unique_device_name();

        let status = Command::new("ip")
            .args(["link", "add", &name, "type", "wireguard"])
            .status()?;

        if !status.success() {
            return Ok(None);
        }

        Ok(Some(Self { name }))
    }

    /// Get the interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the interface index from sysfs.
    pub fn index(&self) -> Result<u32> {
        let path = format!("/sys/class/net/{}/ifindex", self.name);
        let text = std::fs::read_to_string(path)?;
        text.trim()
            .parse()
            .map_err(|_| wgctrl::Error::InvalidMessage(format!("bad ifindex {:?}", text)))
    }
}

impl Drop for TestDevice {
    fn drop(&mut self) {
        let _ = Command::new("ip")
            .args(["link", "del", &self.name])
            .status();
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Open a kernel client, or `None` when the wireguard family is not
/// registered.
pub fn kernel_client() -> Result<Option<Client>> {
    let client = Client::kernel()?;
    match client.transport().family_id() {
        Ok(_) => Ok(Some(client)),
        Err(wgctrl::Error::FamilyNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

/// Bind a kernel client and a fresh device, or skip the test when
/// WireGuard is unavailable.
#[macro_export]
macro_rules! require_wireguard {
    ($client:ident, $device:ident) => {
        let Some($client) = crate::common::kernel_client()? else {
            eprintln!("Skipping test: wireguard family not available");
            return Ok(());
        };
        let Some($device) = crate::common::TestDevice::new()? else {
            eprintln!("Skipping test: cannot create wireguard link");
            return Ok(());
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_device_name() {
        let name1 = unique_device_name();
        let name2 = unique_device_name();
        assert_ne!(name1, name2);
        assert!(name1.len() < 16);
    }
}
