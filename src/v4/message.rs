//! Fixed-layout DHCPv4 message.
//!
//! The canonical BOOTP header (op through file), the magic cookie, and a
//! bounded options area, encoded and decoded in network byte order.

use super::{
    opt, options, BOOT_REQUEST, DHCP_MAGIC, ETHERNET_ADDR_LEN, HTYPE_ETHERNET,
};
use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Capacity of the options area. Together with the 236-byte fixed header
/// and the 4-byte cookie this keeps the whole datagram within the 576-byte
/// minimum IP reassembly size.
pub const OPTIONS_CAPACITY: usize = 308;

/// Size of the fixed header up to and including the cookie.
pub const FIXED_LEN: usize = 240;

/// Full on-wire size of an encoded message.
pub const MESSAGE_LEN: usize = FIXED_LEN + OPTIONS_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Discover),
            2 => Some(Self::Offer),
            3 => Some(Self::Request),
            4 => Some(Self::Decline),
            5 => Some(Self::Ack),
            6 => Some(Self::Nak),
            7 => Some(Self::Release),
            8 => Some(Self::Inform),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload too short for a DHCP message: {0} bytes")]
    TooShort(usize),

    #[error("bad magic cookie: {0:#010x}")]
    BadCookie(u32),
}

/// A complete DHCPv4 message.
#[derive(Debug, Clone)]
pub struct DhcpMessage {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; 16],
    pub sname: [u8; 64],
    pub file: [u8; 128],
    pub options: [u8; OPTIONS_CAPACITY],
}

impl DhcpMessage {
    /// Creates a client message with the protocol-fixed defaults for
    /// `message_type`: BOOTREQUEST op, Ethernet hardware type, the
    /// message-type option, and an otherwise empty terminated options area.
    pub fn new(message_type: MessageType) -> Self {
        let mut options = [0u8; OPTIONS_CAPACITY];
        options[0] = opt::MESSAGE_TYPE;
        options[1] = 1;
        options[2] = message_type as u8;
        options[3] = opt::END;

        Self {
            op: BOOT_REQUEST,
            htype: HTYPE_ETHERNET,
            hlen: ETHERNET_ADDR_LEN,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
            options,
        }
    }

    /// Copies a 6-byte hardware address into `chaddr`, leaving the rest zero.
    pub fn set_hardware_address(&mut self, mac: &[u8]) {
        let len = mac.len().min(self.chaddr.len());
        self.chaddr = [0; 16];
        self.chaddr[..len].copy_from_slice(&mac[..len]);
    }

    /// Serializes the message to its full fixed wire size.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MESSAGE_LEN);
        buf.put_u8(self.op);
        buf.put_u8(self.htype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.hops);
        buf.put_u32(self.xid);
        buf.put_u16(self.secs);
        buf.put_u16(self.flags);
        buf.put_slice(&self.ciaddr.octets());
        buf.put_slice(&self.yiaddr.octets());
        buf.put_slice(&self.siaddr.octets());
        buf.put_slice(&self.giaddr.octets());
        buf.put_slice(&self.chaddr);
        buf.put_slice(&self.sname);
        buf.put_slice(&self.file);
        buf.put_u32(DHCP_MAGIC);
        buf.put_slice(&self.options);
        buf.freeze()
    }

    /// Deserializes a message, verifying the magic cookie. Options beyond
    /// the area capacity are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < FIXED_LEN {
            return Err(DecodeError::TooShort(buf.len()));
        }
        let cookie = u32::from_be_bytes([buf[236], buf[237], buf[238], buf[239]]);
        if cookie != DHCP_MAGIC {
            return Err(DecodeError::BadCookie(cookie));
        }

        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&buf[28..44]);
        let mut sname = [0u8; 64];
        sname.copy_from_slice(&buf[44..108]);
        let mut file = [0u8; 128];
        file.copy_from_slice(&buf[108..236]);
        let mut options = [0u8; OPTIONS_CAPACITY];
        let opt_len = (buf.len() - FIXED_LEN).min(OPTIONS_CAPACITY);
        options[..opt_len].copy_from_slice(&buf[FIXED_LEN..FIXED_LEN + opt_len]);

        Ok(Self {
            op: buf[0],
            htype: buf[1],
            hlen: buf[2],
            hops: buf[3],
            xid: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            secs: u16::from_be_bytes([buf[8], buf[9]]),
            flags: u16::from_be_bytes([buf[10], buf[11]]),
            ciaddr: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            yiaddr: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
            siaddr: Ipv4Addr::new(buf[20], buf[21], buf[22], buf[23]),
            giaddr: Ipv4Addr::new(buf[24], buf[25], buf[26], buf[27]),
            chaddr,
            sname,
            file,
            options,
        })
    }

    /// Raw data of the first occurrence of `code` in the options area.
    pub fn option(&self, code: u8) -> Option<&[u8]> {
        options::lookup(&self.options, code)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.option(opt::MESSAGE_TYPE)
            .and_then(|data| data.first().copied())
            .and_then(MessageType::from_u8)
    }

    pub fn option_ipv4(&self, code: u8) -> Option<Ipv4Addr> {
        self.option(code).and_then(|data| {
            let octets: [u8; 4] = data.get(..4)?.try_into().ok()?;
            Some(Ipv4Addr::from(octets))
        })
    }

    /// All addresses of a list-valued option, in server order.
    pub fn option_ipv4_list(&self, code: u8) -> Option<Vec<Ipv4Addr>> {
        self.option(code).map(|data| {
            data.chunks_exact(4)
                .map(|c| Ipv4Addr::new(c[0], c[1], c[2], c[3]))
                .collect()
        })
    }

    pub fn option_u32(&self, code: u8) -> Option<u32> {
        self.option(code).and_then(|data| {
            let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
            Some(u32::from_be_bytes(bytes))
        })
    }
}
