//! DHCPv4 protocol implementation
//!
//! This module contains the DHCPv4-specific implementation including:
//! - Message construction and option encoding
//! - Raw frame validation and checksums
//! - State machine handling

pub mod builder;
pub mod checksum;
pub mod frame;
pub mod handler;
pub mod message;
pub mod options;
pub mod transmit;
pub mod xid;

#[cfg(test)]
mod tests;

pub use builder::MessageBuilder;
pub use frame::{validate, DiscardReason, FatalReason, FrameResult};
pub use handler::DhcpV4Handler;
pub use message::{DhcpMessage, MessageType};

/// Port the client listens on and sends from.
pub const CLIENT_PORT: u16 = 68;
/// Port DHCP servers listen on.
pub const SERVER_PORT: u16 = 67;

/// Network-order magic constant identifying a DHCP payload.
pub const DHCP_MAGIC: u32 = 0x6382_5363;

/// BOOTP op codes.
pub const BOOT_REQUEST: u8 = 1;
pub const BOOT_REPLY: u8 = 2;

/// Ethernet hardware type and address length.
pub const HTYPE_ETHERNET: u8 = 1;
pub const ETHERNET_ADDR_LEN: u8 = 6;

/// Option codes used by the client (a subset of the IANA registry).
pub mod opt {
    pub const PADDING: u8 = 0;
    pub const SUBNET_MASK: u8 = 1;
    pub const TIME_OFFSET: u8 = 2;
    pub const ROUTER: u8 = 3;
    pub const TIME_SERVER: u8 = 4;
    pub const NAME_SERVER: u8 = 5;
    pub const DNS_SERVER: u8 = 6;
    pub const LOG_SERVER: u8 = 7;
    pub const LPR_SERVER: u8 = 9;
    pub const HOST_NAME: u8 = 12;
    pub const DOMAIN_NAME: u8 = 15;
    pub const ROOT_PATH: u8 = 17;
    pub const MTU: u8 = 26;
    pub const BROADCAST: u8 = 28;
    pub const NTP_SERVER: u8 = 42;
    pub const WINS_SERVER: u8 = 44;
    pub const REQUESTED_IP: u8 = 50;
    pub const LEASE_TIME: u8 = 51;
    pub const MESSAGE_TYPE: u8 = 53;
    pub const SERVER_ID: u8 = 54;
    pub const PARAMETER_REQUEST_LIST: u8 = 55;
    pub const RENEWAL_TIME: u8 = 58;
    pub const REBINDING_TIME: u8 = 59;
    pub const VENDOR_CLASS: u8 = 60;
    pub const CLIENT_ID: u8 = 61;
    pub const FQDN: u8 = 81;
    pub const END: u8 = 255;
}
