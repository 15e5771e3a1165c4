//! DHCP client driver
//!
//! This module contains the core DHCP client logic including:
//! - State machine interface and actions
//! - The receive loop over the raw listening socket
//! - Lease renewal and release

use crate::{
    config::ClientConfig,
    error::BeaconError,
    network::{self, RawSocket},
    v4::{
        frame::{self, FrameResult},
        handler::DhcpV4Handler,
        message::DhcpMessage,
        transmit::Transmitter,
        xid, MessageBuilder,
    },
};
use std::{
    net::Ipv4Addr,
    time::Duration,
};
use tokio::time::{self, Instant};

/// Actions the state machine hands back to the driver.
#[derive(Debug)]
pub enum Action {
    /// Broadcast a message as a raw frame.
    Broadcast(DhcpMessage),
    StoreLease(Lease),
    Wait(Duration),
    Exit,
}

/// External events the state machine responds to.
#[derive(Debug)]
pub enum Event<'a> {
    MessageReceived(&'a DhcpMessage),
    Timeout,
}

/// An obtained lease.
#[derive(Debug, Clone)]
pub struct Lease {
    pub address: Ipv4Addr,
    pub subnet_mask: Option<Ipv4Addr>,
    pub routers: Option<Vec<Ipv4Addr>>,
    pub dns_servers: Option<Vec<Ipv4Addr>>,
    pub lease_duration: Option<Duration>,
    pub renewal_time: Option<Duration>,
    pub server_identifier: Option<Ipv4Addr>,
}

/// Interface between the driver and a DHCP state machine.
pub trait DhcpStateMachine {
    /// Handles one event and returns the next action to execute.
    fn handle_event(&mut self, event: Event) -> Result<Action, BeaconError>;
    /// Name of the current state, for logging.
    fn state_name(&self) -> &'static str;
}

pub struct DhcpClient {
    config: ClientConfig,
    raw_socket: RawSocket,
    state_machine: Box<dyn DhcpStateMachine + Send>,
}

impl DhcpClient {
    pub fn new(config: ClientConfig) -> Result<Self, BeaconError> {
        let raw_socket = RawSocket::open(&config.interface)?;
        let builder = MessageBuilder::new(&config);
        let state_machine = Box::new(DhcpV4Handler::new(builder, xid::next_xid()));

        Ok(Self {
            config,
            raw_socket,
            state_machine,
        })
    }

    /// Waits until a validated reply arrives or `duration` elapses.
    /// Discarded frames keep the wait going; a fatal frame outcome reopens
    /// the listening socket.
    async fn wait_for_response(&mut self, duration: Duration) -> Result<Action, BeaconError> {
        let deadline = Instant::now() + duration;
        tracing::debug!("Waiting for response with timeout: {:?}", duration);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!("Timeout waiting for response");
                return self.state_machine.handle_event(Event::Timeout);
            }
            match time::timeout(remaining, frame::read(&self.raw_socket)).await {
                Ok(FrameResult::Payload(message, len)) => {
                    tracing::debug!("Received {} byte DHCP payload", len);
                    return self
                        .state_machine
                        .handle_event(Event::MessageReceived(&message));
                }
                Ok(FrameResult::Discard(reason)) => {
                    tracing::debug!("Discarding frame: {}", reason);
                }
                Ok(FrameResult::Fatal(reason)) => {
                    tracing::warn!("Listening socket suspect ({}), reopening", reason);
                    self.raw_socket = RawSocket::open(&self.config.interface)?;
                }
                Err(_) => {
                    tracing::debug!("Timeout waiting for response");
                    return self.state_machine.handle_event(Event::Timeout);
                }
            }
        }
    }

    /// Runs the lease acquisition exchange to completion.
    pub async fn run(&mut self) -> Result<Lease, BeaconError> {
        // Kick the state machine off.
        let mut next_action = self.state_machine.handle_event(Event::Timeout)?;

        loop {
            tracing::info!(
                "State: {}, Action: {:?}",
                self.state_machine.state_name(),
                next_action
            );

            match next_action {
                Action::Broadcast(message) => {
                    Transmitter::Broadcast {
                        socket: &self.raw_socket,
                    }
                    .transmit(&message)
                    .await?;
                    next_action = self.wait_for_response(self.config.initial_timeout).await?;
                }
                Action::Wait(duration) => {
                    next_action = self.wait_for_response(duration).await?;
                }
                Action::StoreLease(lease) => {
                    tracing::info!("DHCP bind successful! Lease: {:?}", lease);
                    return Ok(lease);
                }
                Action::Exit => {
                    return Err(BeaconError::Critical(
                        "State machine exited prematurely".to_string(),
                    ));
                }
            }
        }
    }

    /// Sends a renewal request for `lease`. Unicast when the granting
    /// server is known, broadcast otherwise; the reply, if any, is logged.
    pub async fn renew(&mut self, lease: &Lease) -> Result<(), BeaconError> {
        let builder = MessageBuilder::new(&self.config);
        let message = builder.renew(xid::next_xid(), lease.address)?;

        match lease.server_identifier {
            Some(server) => {
                tracing::info!("Sending renew to {}...", server);
                let socket =
                    network::new_bound_udp_socket(&self.config.interface, self.config.client_port)?;
                Transmitter::Unicast {
                    socket: &socket,
                    server,
                }
                .transmit(&message)
                .await?;

                let mut buf = [0u8; 1500];
                match time::timeout(self.config.request_timeout, socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, addr))) => match DhcpMessage::decode(&buf[..len]) {
                        Ok(reply) if reply.xid == message.xid => {
                            tracing::info!("Renewal reply from {}: {:?}", addr, reply.message_type());
                        }
                        Ok(_) => tracing::debug!("Unrelated reply from {}", addr),
                        Err(e) => tracing::debug!("Undecodable renewal reply: {}", e),
                    },
                    Ok(Err(e)) => return Err(BeaconError::Io(e)),
                    Err(_) => tracing::warn!("No reply to renewal request"),
                }
            }
            None => {
                tracing::info!("Sending renew (no known server, broadcasting)...");
                Transmitter::Broadcast {
                    socket: &self.raw_socket,
                }
                .transmit(&message)
                .await?;
            }
        }
        Ok(())
    }

    /// Releases `lease` back to its server. Fire-and-forget, always
    /// unicast; releasing without a known server is not meaningful.
    pub async fn release(&self, lease: &Lease) -> Result<(), BeaconError> {
        let server = lease.server_identifier.ok_or_else(|| {
            BeaconError::Critical("cannot release a lease with no server identifier".to_string())
        })?;

        let builder = MessageBuilder::new(&self.config);
        let message = builder.release(server, lease.address)?;

        tracing::info!("Sending release to {}...", server);
        let socket =
            network::new_bound_udp_socket(&self.config.interface, self.config.client_port)?;
        Transmitter::Unicast {
            socket: &socket,
            server,
        }
        .transmit(&message)
        .await?;
        Ok(())
    }
}
