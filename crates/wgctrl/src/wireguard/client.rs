//! Device queries and configuration on top of pluggable collaborators.

use super::config::{Config, PeerConfig};
use super::encode::{encode_batches, target_attrs};
use super::kernel::{KernelTransport, LinkEnumerator};
use super::key::Key;
use super::merge::DeviceAssembler;
use super::types::{Device, DeviceType};
use super::{WG_GENL_NAME, WgCmd};
use crate::netlink::InterfaceRef;
use crate::netlink::{Error, Result};
use crate::netlink::genl::GENL_HDRLEN;
use crate::netlink::message::NLMSG_HDRLEN;
use crate::netlink::socket::DEFAULT_RECV_BUF;

/// A request for the `wireguard` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `WG_CMD_GET_DEVICE` dump for one device.
    GetDevice {
        /// Device to dump.
        target: InterfaceRef,
    },
    /// `WG_CMD_SET_DEVICE` with an encoded attribute stream.
    SetDevice {
        /// Device to configure. Already named inside `attrs`.
        target: InterfaceRef,
        /// Attribute stream produced by [`encode_batches`].
        attrs: Vec<u8>,
    },
}

impl Request {
    /// The GENL command this request maps to.
    pub fn command(&self) -> WgCmd {
        match self {
            Self::GetDevice { .. } => WgCmd::GetDevice,
            Self::SetDevice { .. } => WgCmd::SetDevice,
        }
    }

    /// The device this request targets.
    pub fn target(&self) -> &InterfaceRef {
        match self {
            Self::GetDevice { target } | Self::SetDevice { target, .. } => target,
        }
    }

    /// Attribute stream to send after the GENL header.
    pub fn attrs(&self) -> Vec<u8> {
        match self {
            Self::GetDevice { target } => target_attrs(target).finish(),
            Self::SetDevice { attrs, .. } => attrs.clone(),
        }
    }
}

/// Sends requests to a WireGuard implementation.
///
/// Implementations must serialise concurrent calls themselves if they
/// share one channel.
pub trait Transport {
    /// Execute one request and return every reply message, in order.
    ///
    /// Each reply is the attribute stream of one message, with the
    /// netlink and GENL headers already removed. Writes return no
    /// replies.
    fn execute(&self, request: &Request) -> Result<Vec<Vec<u8>>>;

    /// Implementation tag for devices reached through this transport.
    fn device_type(&self) -> DeviceType;
}

/// Lists the WireGuard interfaces a client can query.
pub trait InterfaceEnumerator {
    /// Names of every WireGuard interface, in a stable order.
    fn interfaces(&self) -> Result<Vec<String>>;

    /// Resolve an interface index to its name, `None` if there is no such
    /// interface.
    fn index_to_name(&self, index: u32) -> Result<Option<String>>;
}

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Largest netlink message to send, headers included.
    ///
    /// Lowering it only shrinks write requests; replies are always read
    /// into buffers of at least [`DEFAULT_RECV_BUF`] bytes.
    pub max_message_size: usize,
    /// Generic Netlink family to talk to.
    pub family_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_RECV_BUF,
            family_name: WG_GENL_NAME.to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message size ceiling.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the Generic Netlink family name.
    pub fn family_name(mut self, name: impl Into<String>) -> Self {
        self.family_name = name.into();
        self
    }

    /// Attribute bytes available per request once headers are accounted for.
    pub fn max_payload(&self) -> usize {
        self.max_message_size.saturating_sub(NLMSG_HDRLEN + GENL_HDRLEN)
    }

    /// Receive buffer size for the transport socket.
    pub fn recv_buf_size(&self) -> usize {
        self.max_message_size.max(DEFAULT_RECV_BUF)
    }
}

/// WireGuard client.
///
/// Combines a [`Transport`] and an [`InterfaceEnumerator`]. The defaults
/// talk to the kernel over netlink.
///
/// # Example
///
/// ```rust,no_run
/// use wgctrl::wireguard::Client;
///
/// # fn example() -> wgctrl::Result<()> {
/// let client = Client::kernel()?;
/// let device = client.device_by_name("wg0")?;
/// println!("{} has {} peers", device.name, device.peers.len());
/// # Ok(())
/// # }
/// ```
pub struct Client<T = KernelTransport, E = LinkEnumerator> {
    transport: T,
    enumerator: E,
    options: ClientOptions,
}

impl Client {
    /// Connect to the kernel with default options.
    pub fn kernel() -> Result<Self> {
        Self::kernel_with_options(ClientOptions::default())
    }

    /// Connect to the kernel with custom options.
    pub fn kernel_with_options(options: ClientOptions) -> Result<Self> {
        let transport = KernelTransport::with_options(&options)?;
        let enumerator = LinkEnumerator::new()?;
        Ok(Self::with_options(transport, enumerator, options))
    }
}

impl<T: Transport, E: InterfaceEnumerator> Client<T, E> {
    /// Create a client from its collaborators with default options.
    pub fn new(transport: T, enumerator: E) -> Self {
        Self::with_options(transport, enumerator, ClientOptions::default())
    }

    /// Create a client from its collaborators.
    pub fn with_options(transport: T, enumerator: E, options: ClientOptions) -> Self {
        Self {
            transport,
            enumerator,
            options,
        }
    }

    /// Get the client options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the interface enumerator.
    pub fn enumerator(&self) -> &E {
        &self.enumerator
    }

    /// Fetch every WireGuard device, in enumeration order.
    ///
    /// The first failure aborts the whole listing.
    pub fn devices(&self) -> Result<Vec<Device>> {
        let names = self.enumerator.interfaces()?;
        tracing::debug!(count = names.len(), "enumerated wireguard interfaces");

        names
            .iter()
            .map(|name| self.device_by_name(name))
            .collect()
    }

    /// Fetch one device by interface name.
    pub fn device_by_name(&self, name: &str) -> Result<Device> {
        self.fetch(InterfaceRef::name(name))
    }

    /// Fetch one device by interface index.
    pub fn device_by_index(&self, index: u32) -> Result<Device> {
        let name = self
            .enumerator
            .index_to_name(index)?
            .ok_or_else(|| Error::InterfaceNotFound {
                name: InterfaceRef::index(index).to_string(),
            })?;
        self.device_by_name(&name)
    }

    fn fetch(&self, target: InterfaceRef) -> Result<Device> {
        let replies = self.transport.execute(&Request::GetDevice {
            target: target.clone(),
        })?;

        if replies.is_empty() {
            return Err(Error::InterfaceNotFound {
                name: target.to_string(),
            });
        }

        let mut assembler = DeviceAssembler::new();
        for reply in &replies {
            assembler.push_fragment(reply)?;
        }
        let mut device = assembler.finish();

        if device.name.is_empty() {
            if let InterfaceRef::Name(name) = target {
                device.name = name;
            }
        }
        device.device_type = self.transport.device_type();

        tracing::debug!(
            device = %device.name,
            fragments = replies.len(),
            peers = device.peers.len(),
            "fetched wireguard device"
        );

        Ok(device)
    }

    /// Apply a configuration to a device.
    ///
    /// Large configurations are sent as several requests. If one fails
    /// after others were accepted, the error is [`Error::PartialWrite`]
    /// and the device is left with the changes applied so far.
    pub fn configure_device(&self, name: &str, config: &Config) -> Result<()> {
        let target = InterfaceRef::name(name);
        let batches = encode_batches(&target, config, self.options.max_payload())?;
        let total = batches.len();
        tracing::debug!(
            device = name,
            requests = total,
            peers = config.peers.len(),
            "configuring wireguard device"
        );

        for (applied, attrs) in batches.into_iter().enumerate() {
            tracing::trace!(device = name, request = applied, len = attrs.len(), "set device");
            let request = Request::SetDevice {
                target: target.clone(),
                attrs,
            };
            if let Err(e) = self.transport.execute(&request) {
                if applied == 0 {
                    return Err(e);
                }
                return Err(Error::PartialWrite {
                    applied,
                    total,
                    source: Box::new(e),
                });
            }
        }

        Ok(())
    }

    /// Remove one peer from a device.
    pub fn remove_peer(&self, name: &str, public_key: &Key) -> Result<()> {
        let config = Config::new().peer(PeerConfig::new(*public_key).remove());
        self.configure_device(name, &config)
    }
}
