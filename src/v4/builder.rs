//! Outbound message assembly.
//!
//! Builds the four client message types from header defaults, the client's
//! identity options, and the option-capability table. The builder is
//! transmission-agnostic: whether a message is broadcast as a raw frame or
//! unicast on a bound socket is the caller's choice.

use super::{
    message::{DhcpMessage, MessageType},
    opt,
    options::{self, OptionError, OPTION_TABLE},
    xid,
};
use crate::config::ClientConfig;
use bytes::Bytes;
use std::net::Ipv4Addr;

pub struct MessageBuilder {
    hardware_address: Bytes,
    client_id: Option<Vec<u8>>,
    hostname: Option<String>,
    fqdn: Option<String>,
    vendor_class: String,
}

impl MessageBuilder {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            hardware_address: config.mac_address.clone(),
            client_id: config.client_id.clone(),
            hostname: config.hostname.clone(),
            fqdn: config.fqdn.clone(),
            vendor_class: config.vendor_class.clone(),
        }
    }

    /// Header defaults plus the configured identity options, shared by
    /// every message type.
    fn init_message(&self, message_type: MessageType) -> Result<DhcpMessage, OptionError> {
        let mut message = DhcpMessage::new(message_type);
        message.set_hardware_address(&self.hardware_address);

        if let Some(ref client_id) = self.client_id {
            options::append(&mut message.options, opt::CLIENT_ID, client_id)?;
        }
        if let Some(ref hostname) = self.hostname {
            options::append(&mut message.options, opt::HOST_NAME, hostname.as_bytes())?;
        }
        if let Some(ref fqdn) = self.fqdn {
            // Flags and the two rcode bytes are zero; the server fills them in.
            let mut data = vec![0u8, 0, 0];
            data.extend_from_slice(fqdn.as_bytes());
            options::append(&mut message.options, opt::FQDN, &data)?;
        }
        options::append(
            &mut message.options,
            opt::VENDOR_CLASS,
            self.vendor_class.as_bytes(),
        )?;
        Ok(message)
    }

    /// A DISCOVER with an optionally requested address. Broadcast.
    pub fn discover(
        &self,
        xid: u32,
        requested: Option<Ipv4Addr>,
    ) -> Result<DhcpMessage, OptionError> {
        let mut message = self.init_message(MessageType::Discover)?;
        message.xid = xid;
        if let Some(address) = requested.filter(|a| !a.is_unspecified()) {
            options::append_u32(&mut message.options, opt::REQUESTED_IP, address.into())?;
        }
        append_parameter_request_list(&mut message.options)?;
        Ok(message)
    }

    /// A REQUEST accepting a specific server's offer. Broadcast, since the
    /// client has no usable address yet.
    pub fn select(
        &self,
        xid: u32,
        server: Ipv4Addr,
        requested: Ipv4Addr,
    ) -> Result<DhcpMessage, OptionError> {
        let mut message = self.init_message(MessageType::Request)?;
        message.xid = xid;
        options::append_u32(&mut message.options, opt::REQUESTED_IP, requested.into())?;
        options::append_u32(&mut message.options, opt::SERVER_ID, server.into())?;
        append_parameter_request_list(&mut message.options)?;
        Ok(message)
    }

    /// A REQUEST extending an existing lease. The client address goes in
    /// `ciaddr` rather than the requested-IP option. Unicast when the
    /// server is known, broadcast otherwise.
    pub fn renew(&self, xid: u32, client: Ipv4Addr) -> Result<DhcpMessage, OptionError> {
        let mut message = self.init_message(MessageType::Request)?;
        message.xid = xid;
        message.ciaddr = client;
        append_parameter_request_list(&mut message.options)?;
        Ok(message)
    }

    /// A RELEASE returning the lease to `server`. Fire-and-forget: no reply
    /// is awaited, so the transaction id is freshly generated rather than
    /// caller-supplied. Always unicast.
    pub fn release(&self, server: Ipv4Addr, client: Ipv4Addr) -> Result<DhcpMessage, OptionError> {
        let mut message = self.init_message(MessageType::Release)?;
        message.xid = xid::next_xid();
        message.ciaddr = client;
        options::append_u32(&mut message.options, opt::REQUESTED_IP, client.into())?;
        options::append_u32(&mut message.options, opt::SERVER_ID, server.into())?;
        Ok(message)
    }
}

/// Appends the parameter-request-list: one pass over the option-capability
/// table, collecting every code flagged `requested`. The option's length is
/// exactly that count and the END marker sits immediately after.
fn append_parameter_request_list(opts: &mut [u8]) -> Result<(), OptionError> {
    let codes: Vec<u8> = OPTION_TABLE
        .iter()
        .filter(|spec| spec.requested)
        .map(|spec| spec.code)
        .collect();
    options::append(opts, opt::PARAMETER_REQUEST_LIST, &codes)
}
