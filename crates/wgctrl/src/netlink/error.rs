//! Error types for WireGuard netlink operations.

use std::io;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while querying or configuring a device.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Kernel error with operation context.
    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        /// The operation that failed.
        operation: String,
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message framing.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The kernel flagged a dump as interrupted by a concurrent change.
    ///
    /// The replies already received may be inconsistent; retry the query.
    #[error("dump interrupted by a concurrent change")]
    DumpInterrupted,

    /// A known attribute carried a payload that cannot be decoded.
    ///
    /// Decoding never recovers from this: the whole query fails.
    #[error("malformed {attr} attribute: {reason}")]
    MalformedField {
        /// Name of the offending attribute.
        attr: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Generic Netlink family not registered (module not loaded).
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// The family name that was looked up.
        name: String,
    },

    /// Interface not found.
    #[error("interface not found: {name}")]
    InterfaceNotFound {
        /// The interface name (or index) that was not found.
        name: String,
    },

    /// The configuration cannot be expressed as netlink requests.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batched write failed after some batches were already applied.
    ///
    /// The device is left partially configured; re-query it to learn
    /// its actual state.
    #[error("configuration partially applied ({applied} of {total} requests): {source}")]
    PartialWrite {
        /// Number of requests the kernel accepted.
        applied: usize,
        /// Total number of requests in the write.
        total: usize,
        /// The error that stopped the sequence.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a kernel error from an errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Create a malformed-attribute error.
    pub fn malformed(attr: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedField {
            attr,
            reason: reason.into(),
        }
    }

    /// Add context to this error.
    ///
    /// Wraps kernel errors with operation context. Other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel { errno, message } => Self::KernelWithContext {
                operation: operation.into(),
                errno,
                message,
            },
            other => other,
        }
    }

    /// Check if this is a decode failure.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedField { .. })
    }

    /// Check if this error came from the request/response exchange itself
    /// (socket, kernel, framing) rather than from decoding or configuration.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Kernel { .. }
                | Self::KernelWithContext { .. }
                | Self::Truncated { .. }
                | Self::InvalidMessage(_)
                | Self::DumpInterrupted
                | Self::FamilyNotFound { .. }
        )
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, 2 | 19) // ENOENT=2, ENODEV=19
            }
            Self::InterfaceNotFound { .. } | Self::FamilyNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, 1 | 13) // EPERM=1, EACCES=13
            }
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            Self::PartialWrite { source, .. } => source.errno(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errno() {
        let err = Error::from_errno(-1); // EPERM
        assert!(err.is_permission_denied());
        assert!(err.is_transport_failure());
        assert_eq!(err.errno(), Some(1));
    }

    #[test]
    fn test_with_context() {
        let err = Error::from_errno(-19).with_context("getting device wg0"); // ENODEV
        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("getting device wg0"));
    }

    #[test]
    fn test_malformed_is_not_transport() {
        let err = Error::malformed("peer endpoint", "unexpected length 1");
        assert!(err.is_malformed());
        assert!(!err.is_transport_failure());
        assert_eq!(
            err.to_string(),
            "malformed peer endpoint attribute: unexpected length 1"
        );
    }

    #[test]
    fn test_partial_write_keeps_source() {
        let err = Error::PartialWrite {
            applied: 2,
            total: 3,
            source: Box::new(Error::from_errno(-12)), // ENOMEM
        };
        assert_eq!(err.errno(), Some(12));
        assert!(err.to_string().starts_with("configuration partially applied (2 of 3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InterfaceNotFound { name: "wg0".into() };
        assert_eq!(err.to_string(), "interface not found: wg0");

        let err = Error::FamilyNotFound {
            name: "wireguard".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "generic netlink family not found: wireguard"
        );
    }
}
