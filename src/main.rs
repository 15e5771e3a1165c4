use beacon::{Args, BeaconError, ClientConfig, DhcpClient};
use bytes::{BufMut, Bytes, BytesMut};
use clap::Parser;
use std::time::Duration;
use tokio::{fs, signal, time};
use tracing_subscriber::EnvFilter;

/// Parses a MAC address string (e.g., "0a:1b:2c:3d:4e:5f") into a `Bytes` object.
fn parse_mac_address(mac_str: &str) -> Result<Bytes, BeaconError> {
    let mut bytes = BytesMut::new();
    for byte_str in mac_str.split(':') {
        if !byte_str.is_empty() {
            let byte = u8::from_str_radix(byte_str, 16)
                .map_err(|_| BeaconError::MacParse(mac_str.to_string()))?;
            bytes.put_u8(byte);
        }
    }
    if bytes.len() != 6 {
        return Err(BeaconError::MacParse(mac_str.to_string()));
    }
    Ok(bytes.freeze())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    // Read the hardware (MAC) address from the system.
    let mac_path = format!("/sys/class/net/{}/address", &args.interface);
    let mac_str = fs::read_to_string(&mac_path).await?;
    let mac_addr = parse_mac_address(mac_str.trim())?;
    tracing::info!("Using interface {} ({})", args.interface, mac_str.trim());

    let mut config = ClientConfig::new(args.interface, mac_addr);
    config.hostname = args.hostname;
    config.fqdn = args.fqdn;

    let mut client = DhcpClient::new(config)?;
    let lease = client.run().await?;
    tracing::info!("Lease obtained: {:?}", lease);

    // Renew on the server's T1 timer (half the lease as a fallback) until
    // interrupted, then hand the address back.
    let renew_after = lease
        .renewal_time
        .or(lease.lease_duration.map(|d| d / 2))
        .unwrap_or(Duration::from_secs(1800));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Interrupted, releasing lease");
                if let Err(e) = client.release(&lease).await {
                    tracing::warn!("Release failed: {}", e);
                }
                break;
            }
            _ = time::sleep(renew_after) => {
                if let Err(e) = client.renew(&lease).await {
                    tracing::warn!("Renewal failed: {}", e);
                }
            }
        }
    }

    Ok(())
}
