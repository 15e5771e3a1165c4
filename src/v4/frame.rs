//! Validation of raw frames from the listening packet socket.
//!
//! The socket delivers untrusted bytes straight off the link, so every
//! reply passes a strict, ordered sequence of structural and checksum
//! checks before its DHCP payload is handed to the state machine. Each
//! failure short-circuits the rest and classifies the frame as either
//! routine noise to discard or a fatal anomaly of the listening path.

use super::{
    checksum::{internet_checksum, udp_checksum},
    message::{DecodeError, DhcpMessage, MESSAGE_LEN},
    CLIENT_PORT,
};
use crate::network::RawSocket;
use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

/// Minimal IPv4 header, no options.
pub const IP_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

/// Largest frame the client accepts: headers plus a full DHCP message.
pub const FRAME_CAPACITY: usize = IP_HEADER_LEN + UDP_HEADER_LEN + MESSAGE_LEN;

/// Pause after a failed read, so a downed interface does not busy-loop
/// the caller's retry policy.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Noise on a shared broadcast medium: drop the frame, keep listening.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    #[error("frame shorter than IP and UDP headers")]
    TooShort,

    #[error("frame truncated below the IP-declared total length")]
    Truncated,

    #[error("not an IPv4/UDP frame for the client port")]
    Unrelated,

    #[error("bad UDP checksum")]
    BadUdpChecksum,

    #[error("bad magic cookie")]
    BadCookie,
}

/// The listening path itself is suspect: the caller should close and
/// reopen the socket.
#[derive(Error, Debug)]
pub enum FatalReason {
    #[error("raw socket read failed")]
    Read(#[source] io::Error),

    #[error("bad IP header checksum")]
    BadIpChecksum,
}

/// Outcome of one receive attempt.
#[derive(Debug)]
pub enum FrameResult {
    /// A validated DHCP payload and its byte length.
    Payload(DhcpMessage, usize),
    Discard(DiscardReason),
    Fatal(FatalReason),
}

/// Performs one read on the raw socket and validates whatever arrives.
/// Never loops internally; retry and backoff belong to the caller.
pub async fn read(socket: &RawSocket) -> FrameResult {
    let mut buf = [0u8; FRAME_CAPACITY];
    match socket.recv(&mut buf).await {
        Ok(len) => validate(&buf[..len]),
        Err(e) => {
            tracing::debug!("could not read on raw listening socket: {e}");
            tokio::time::sleep(READ_ERROR_BACKOFF).await;
            FrameResult::Fatal(FatalReason::Read(e))
        }
    }
}

/// Validates one received frame: structure, checksums, and the DHCP magic
/// cookie, in order.
pub fn validate(buf: &[u8]) -> FrameResult {
    if buf.len() < IP_HEADER_LEN + UDP_HEADER_LEN {
        tracing::debug!("message too short, ignoring");
        return FrameResult::Discard(DiscardReason::TooShort);
    }

    let total_len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < total_len {
        tracing::debug!("truncated frame, ignoring");
        return FrameResult::Discard(DiscardReason::Truncated);
    }
    if total_len < IP_HEADER_LEN + UDP_HEADER_LEN {
        tracing::debug!("declared length shorter than headers, ignoring");
        return FrameResult::Discard(DiscardReason::TooShort);
    }
    // Trailing bytes beyond the IP-declared length are link padding.
    let frame = &buf[..total_len];

    let version = frame[0] >> 4;
    let ihl = frame[0] & 0x0f;
    let protocol = frame[9];
    let dest_port = u16::from_be_bytes([frame[22], frame[23]]);
    let udp_len = u16::from_be_bytes([frame[24], frame[25]]) as usize;
    if protocol != libc::IPPROTO_UDP as u8
        || version != 4
        || ihl != (IP_HEADER_LEN / 4) as u8
        || dest_port != CLIENT_PORT
        || total_len > FRAME_CAPACITY
        || udp_len != total_len - IP_HEADER_LEN
    {
        tracing::debug!("unrelated/bogus frame, ignoring");
        return FrameResult::Discard(DiscardReason::Unrelated);
    }

    // IP header checksum, with the checksum field itself zeroed. A local
    // stack should never deliver a corrupt one, so a mismatch is treated
    // as more severe than ordinary noise.
    let stored = u16::from_be_bytes([frame[10], frame[11]]);
    let mut header = [0u8; IP_HEADER_LEN];
    header.copy_from_slice(&frame[..IP_HEADER_LEN]);
    header[10] = 0;
    header[11] = 0;
    if stored != internet_checksum(&header) {
        tracing::warn!("frame with bad IP header checksum received");
        return FrameResult::Fatal(FatalReason::BadIpChecksum);
    }

    // UDP checksum over the pseudo-header. A stored zero is the protocol's
    // "no checksum" sentinel.
    let source = Ipv4Addr::new(frame[12], frame[13], frame[14], frame[15]);
    let destination = Ipv4Addr::new(frame[16], frame[17], frame[18], frame[19]);
    let stored = u16::from_be_bytes([frame[26], frame[27]]);
    if stored != 0 {
        let mut segment = frame[IP_HEADER_LEN..].to_vec();
        segment[6] = 0;
        segment[7] = 0;
        let computed = udp_checksum(source, destination, &segment);
        // Senders transmit a computed zero as all ones (RFC 768), so both
        // forms of zero match.
        if stored != computed && !(computed == 0 && stored == 0xffff) {
            tracing::debug!("frame with bad UDP checksum received, ignoring");
            return FrameResult::Discard(DiscardReason::BadUdpChecksum);
        }
    }

    let payload = &frame[IP_HEADER_LEN + UDP_HEADER_LEN..];
    match DhcpMessage::decode(payload) {
        Ok(message) => FrameResult::Payload(message, payload.len()),
        Err(DecodeError::TooShort(_)) => {
            tracing::debug!("payload too short for a DHCP message, ignoring");
            FrameResult::Discard(DiscardReason::TooShort)
        }
        Err(DecodeError::BadCookie(_)) => {
            tracing::debug!("received bogus message (bad magic), ignoring");
            FrameResult::Discard(DiscardReason::BadCookie)
        }
    }
}
