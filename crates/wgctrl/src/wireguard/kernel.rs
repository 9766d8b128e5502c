//! Kernel-backed collaborators: GENL transport and RTNetlink enumeration.

use super::client::{ClientOptions, InterfaceEnumerator, Request, Transport};
use super::types::DeviceType;
use super::{WG_GENL_VERSION, WG_LINK_KIND};
use crate::netlink::Result;
use crate::netlink::genl::GenlConnection;
use crate::netlink::link::LinkConnection;
use crate::netlink::socket::{NetlinkSocket, Protocol};

/// [`Transport`] over the in-kernel `wireguard` Generic Netlink family.
///
/// The family id is resolved on first use and cached.
pub struct KernelTransport {
    genl: GenlConnection,
    family_name: String,
}

impl KernelTransport {
    /// Open a GENL socket with default options.
    pub fn new() -> Result<Self> {
        Self::with_options(&ClientOptions::default())
    }

    /// Open a GENL socket sized by [`ClientOptions::recv_buf_size`].
    pub fn with_options(options: &ClientOptions) -> Result<Self> {
        let socket = NetlinkSocket::with_recv_buf(Protocol::Generic, options.recv_buf_size())?;
        Ok(Self {
            genl: GenlConnection::from_socket(socket),
            family_name: options.family_name.clone(),
        })
    }

    /// Get the underlying GENL connection.
    pub fn genl(&self) -> &GenlConnection {
        &self.genl
    }

    /// Resolve the family id, failing with
    /// [`Error::FamilyNotFound`](crate::Error::FamilyNotFound) when the
    /// module is not loaded.
    pub fn family_id(&self) -> Result<u16> {
        self.genl.get_family_id(&self.family_name)
    }
}

impl Transport for KernelTransport {
    fn execute(&self, request: &Request) -> Result<Vec<Vec<u8>>> {
        let family_id = self.family_id()?;
        let cmd = request.command() as u8;
        let attrs = request.attrs();

        match request {
            Request::GetDevice { target } => self
                .genl
                .dump_command(family_id, cmd, WG_GENL_VERSION, &attrs)
                .map_err(|e| e.with_context(format!("getting wireguard device {}", target))),
            Request::SetDevice { target, .. } => {
                self.genl
                    .command(family_id, cmd, WG_GENL_VERSION, &attrs)
                    .map_err(|e| e.with_context(format!("setting wireguard device {}", target)))?;
                Ok(Vec::new())
            }
        }
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::LinuxKernel
    }
}

/// [`InterfaceEnumerator`] that lists links of kind `wireguard`.
pub struct LinkEnumerator {
    links: LinkConnection,
}

impl LinkEnumerator {
    /// Open a NETLINK_ROUTE socket.
    pub fn new() -> Result<Self> {
        Ok(Self {
            links: LinkConnection::new()?,
        })
    }
}

impl InterfaceEnumerator for LinkEnumerator {
    fn interfaces(&self) -> Result<Vec<String>> {
        Ok(self
            .links
            .get_links()?
            .into_iter()
            .filter(|link| link.kind.as_deref() == Some(WG_LINK_KIND))
            .map(|link| link.name)
            .collect())
    }

    fn index_to_name(&self, index: u32) -> Result<Option<String>> {
        Ok(self
            .links
            .get_links()?
            .into_iter()
            .find(|link| link.index == index)
            .map(|link| link.name))
    }
}
