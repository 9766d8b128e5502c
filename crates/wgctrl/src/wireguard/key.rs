//! WireGuard keys.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::types::ParseError;

/// Size of a WireGuard key in bytes.
pub const WG_KEY_LEN: usize = 32;

/// A 32-byte WireGuard key (private, public or preshared).
///
/// Keys compare by exact byte equality. Displayed and parsed as standard
/// base64, the format `wg(8)` prints.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Key([u8; WG_KEY_LEN]);

impl Key {
    /// The all-zero key.
    ///
    /// The kernel reports unset keys as all zeros. Sending it as a private
    /// or preshared key clears the existing one.
    pub const CLEAR: Key = Key([0u8; WG_KEY_LEN]);

    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; WG_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice that must be exactly 32 bytes long.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        data.try_into().ok().map(Self)
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; WG_KEY_LEN] {
        &self.0
    }

    /// Check if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl From<[u8; WG_KEY_LEN]> for Key {
    fn from(bytes: [u8; WG_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.to_base64())
    }
}

impl FromStr for Key {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| ParseError::new("key", e.to_string()))?;
        Key::from_slice(&bytes).ok_or_else(|| {
            ParseError::new(
                "key",
                format!("expected {} bytes, got {}", WG_KEY_LEN, bytes.len()),
            )
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Key {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}
