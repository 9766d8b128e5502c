//! Interface reference type.
//!
//! WireGuard requests name their target device either by interface name
//! (`WGDEVICE_A_IFNAME`) or by interface index (`WGDEVICE_A_IFINDEX`);
//! [`InterfaceRef`] carries whichever the caller has.

use std::fmt;

/// A reference to a network interface, either by name or by index.
///
/// ```
/// use wgctrl::netlink::InterfaceRef;
///
/// let by_name: InterfaceRef = "wg0".into();
/// let by_index: InterfaceRef = 4u32.into();
/// assert_eq!(by_name.as_name(), Some("wg0"));
/// assert_eq!(by_index.to_string(), "ifindex:4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceRef {
    /// Interface specified by name.
    Name(String),
    /// Interface specified by index.
    Index(u32),
}

impl InterfaceRef {
    /// Create an interface reference from a name.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an interface reference from an index.
    #[inline]
    pub fn index(index: u32) -> Self {
        Self::Index(index)
    }

    /// Get the name if this is a name reference.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    /// Get the index if this is an index reference.
    #[inline]
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Name(_) => None,
            Self::Index(idx) => Some(*idx),
        }
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Index(idx) => write!(f, "ifindex:{}", idx),
        }
    }
}

impl From<&str> for InterfaceRef {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for InterfaceRef {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<u32> for InterfaceRef {
    #[inline]
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}
