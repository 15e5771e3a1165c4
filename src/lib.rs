//! # Beacon - A DHCPv4 Client Wire-Protocol Implementation
//!
//! Beacon is a DHCPv4 client written in Rust that builds its messages and
//! validates its replies at the raw-socket level: hand-assembled IP/UDP
//! headers with computed checksums on the way out, and strict structural
//! and checksum validation of every untrusted link-layer frame on the way
//! in, before any lease state is touched.
//!
//! ## Features
//!
//! - The four client message types: DISCOVER, REQUEST (selecting),
//!   REQUEST (renewing), RELEASE
//! - Checked, fixed-capacity option encoding that cannot overrun
//! - Manual IP/UDP header validation with pseudo-header UDP checksums
//! - Broadcast raw-frame and bound unicast transmission paths
//! - Asynchronous operation using Tokio (Linux focus)
//!
//! ## Example
//!
//! ```rust,no_run
//! use beacon::{ClientConfig, DhcpClient};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mac_addr = Bytes::from_static(&[0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4]);
//!     let config = ClientConfig::new("eth0".to_string(), mac_addr);
//!     let mut client = DhcpClient::new(config)?;
//!     let lease = client.run().await?;
//!     println!("Obtained lease: {:?}", lease);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod v4;

pub use client::{DhcpClient, Lease};
pub use config::{Args, ClientConfig};
pub use error::BeaconError;
