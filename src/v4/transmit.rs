//! Putting a built message on the wire.
//!
//! One capability, two paths: before the client has a usable address it
//! broadcasts hand-framed IP/UDP packets on the raw socket; once a server
//! is known it unicasts the bare payload from a bound UDP socket. The
//! builders stay transmission-agnostic and the caller picks the variant.

use super::{
    checksum::{internet_checksum, udp_checksum},
    frame::{IP_HEADER_LEN, UDP_HEADER_LEN},
    message::DhcpMessage,
    CLIENT_PORT, SERVER_PORT,
};
use crate::network::RawSocket;
use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use std::net::Ipv4Addr;
use tokio::net::UdpSocket;

const BROADCAST_MAC: [u8; 6] = [0xff; 6];
const IP_TTL: u8 = 64;

pub enum Transmitter<'a> {
    /// Raw broadcast from 0.0.0.0:68 to 255.255.255.255:67, addressed to
    /// the all-ones hardware address on the socket's interface.
    Broadcast { socket: &'a RawSocket },
    /// Unicast datagram to a known server from an already-bound socket.
    Unicast {
        socket: &'a UdpSocket,
        server: Ipv4Addr,
    },
}

impl Transmitter<'_> {
    pub async fn transmit(&self, message: &DhcpMessage) -> io::Result<()> {
        let payload = message.encode();
        match self {
            Transmitter::Broadcast { socket } => {
                let frame = encapsulate(
                    &payload,
                    Ipv4Addr::UNSPECIFIED,
                    CLIENT_PORT,
                    Ipv4Addr::BROADCAST,
                    SERVER_PORT,
                );
                socket.send_to(&frame, &BROADCAST_MAC).await?;
            }
            Transmitter::Unicast { socket, server } => {
                socket.send_to(&payload, (*server, SERVER_PORT)).await?;
            }
        }
        Ok(())
    }
}

/// Wraps `payload` in IPv4 and UDP headers with both checksums computed.
pub fn encapsulate(
    payload: &[u8],
    source: Ipv4Addr,
    source_port: u16,
    destination: Ipv4Addr,
    destination_port: u16,
) -> Bytes {
    let udp_len = UDP_HEADER_LEN + payload.len();
    let total_len = IP_HEADER_LEN + udp_len;

    let mut udp = BytesMut::with_capacity(udp_len);
    udp.put_u16(source_port);
    udp.put_u16(destination_port);
    udp.put_u16(udp_len as u16);
    udp.put_u16(0);
    udp.put_slice(payload);
    // A computed zero goes out as all ones; zero on the wire means
    // "no checksum" (RFC 768).
    let udp_check = match udp_checksum(source, destination, &udp) {
        0 => 0xffff,
        check => check,
    };
    udp[6..8].copy_from_slice(&udp_check.to_be_bytes());

    let mut ip = BytesMut::with_capacity(total_len);
    ip.put_u8(0x45); // version 4, IHL 5
    ip.put_u8(0); // TOS
    ip.put_u16(total_len as u16);
    ip.put_u16(0); // identification
    ip.put_u16(0); // flags and fragment offset
    ip.put_u8(IP_TTL);
    ip.put_u8(libc::IPPROTO_UDP as u8);
    ip.put_u16(0); // checksum, filled in below
    ip.put_slice(&source.octets());
    ip.put_slice(&destination.octets());
    let ip_check = internet_checksum(&ip);
    ip[10..12].copy_from_slice(&ip_check.to_be_bytes());

    ip.put_slice(&udp);
    ip.freeze()
}
