//! Integration test entry point.
//!
//! These tests create real WireGuard interfaces in the current network
//! namespace, so they need root and the `wireguard` kernel module. They
//! skip themselves when either is missing.
//!
//! # Running Tests
//!
//! ```bash
//! # Run all integration tests
//! sudo cargo test -p wgctrl --features integration --test integration
//!
//! # Run a single test
//! sudo cargo test -p wgctrl --features integration --test integration test_configure_roundtrip
//! ```
//!
//! # Test Organization
//!
//! - `device.rs` - Device queries and configuration round trips

#[macro_use]
#[path = "common/mod.rs"]
mod common;

#[path = "integration/device.rs"]
mod device;
