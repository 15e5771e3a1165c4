//! Internet (RFC 1071) ones'-complement checksum.
//!
//! One fold shared by every call site: the IP header checksum and the
//! UDP pseudo-header checksum, on both the send and receive paths.

use std::net::Ipv4Addr;

/// Computes the internet checksum over `data`, treated as big-endian
/// 16-bit words. An odd trailing byte is padded with zero.
///
/// To verify a received header, zero its checksum field first and compare
/// the result against the stored (big-endian) value.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = chunks.remainder() {
        sum += u32::from(*last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Computes the UDP checksum for `segment` (UDP header plus payload, with
/// the checksum field zeroed) using the standard pseudo-header: source and
/// destination addresses, the UDP protocol number, and the UDP length in
/// place of the IP total length.
pub fn udp_checksum(source: Ipv4Addr, destination: Ipv4Addr, segment: &[u8]) -> u16 {
    let mut buf = Vec::with_capacity(12 + segment.len());
    buf.extend_from_slice(&source.octets());
    buf.extend_from_slice(&destination.octets());
    buf.push(0);
    buf.push(libc::IPPROTO_UDP as u8);
    buf.extend_from_slice(&(segment.len() as u16).to_be_bytes());
    buf.extend_from_slice(segment);
    internet_checksum(&buf)
}
