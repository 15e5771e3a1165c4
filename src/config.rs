use bytes::Bytes;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The network interface to bind to (e.g., 'eth0', 'lo')
    #[arg(short, long)]
    pub interface: String,

    /// Hostname to announce to the server
    #[arg(long)]
    pub hostname: Option<String>,

    /// Fully qualified domain name to announce to the server
    #[arg(long)]
    pub fqdn: Option<String>,
}

pub struct ClientConfig {
    pub interface: String,
    pub mac_address: Bytes,
    /// Client-identifier option data; defaults to the hardware type byte
    /// followed by the MAC address.
    pub client_id: Option<Vec<u8>>,
    pub hostname: Option<String>,
    pub fqdn: Option<String>,
    pub vendor_class: String,
    pub client_port: u16,
    pub server_port: u16,
    pub initial_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(interface: String, mac_address: Bytes) -> Self {
        let mut client_id = Vec::with_capacity(1 + mac_address.len());
        client_id.push(crate::v4::HTYPE_ETHERNET);
        client_id.extend_from_slice(&mac_address);

        Self {
            interface,
            mac_address,
            client_id: Some(client_id),
            hostname: None,
            fqdn: None,
            vendor_class: concat!("beacon ", env!("CARGO_PKG_VERSION")).to_string(),
            client_port: crate::v4::CLIENT_PORT,
            server_port: crate::v4::SERVER_PORT,
            initial_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}
