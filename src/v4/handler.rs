//! DHCPv4 state machine implementation
//!
//! This module implements the DHCPv4 client state machine that handles
//! the complete DORA (Discover, Offer, Request, Acknowledge) process.

use super::{builder::MessageBuilder, message::MessageType, opt, xid, DhcpMessage};
use crate::{
    client::{Action, DhcpStateMachine, Event, Lease},
    error::BeaconError,
};
use std::net::Ipv4Addr;
use std::time::Duration;

#[derive(Debug, PartialEq, Clone, Copy)]
enum DhcpV4State {
    Init,
    Selecting,
    Requesting,
    Bound,
}

pub struct DhcpV4Handler {
    state: DhcpV4State,
    builder: MessageBuilder,
    xid: u32,
    offer: Option<(Ipv4Addr, Ipv4Addr)>, // (offered address, server id)
}

impl DhcpV4Handler {
    pub fn new(builder: MessageBuilder, xid: u32) -> Self {
        Self {
            state: DhcpV4State::Init,
            builder,
            xid,
            offer: None,
        }
    }

    fn handle_init(&mut self) -> Result<Action, BeaconError> {
        self.state = DhcpV4State::Selecting;
        let discover = self.builder.discover(self.xid, None)?;
        Ok(Action::Broadcast(discover))
    }

    fn handle_selecting(&mut self, event: Event) -> Result<Action, BeaconError> {
        match event {
            Event::MessageReceived(message) => {
                tracing::debug!(
                    "Reply in Selecting state: XID={:x}, our XID={:x}",
                    message.xid,
                    self.xid
                );

                if message.xid != self.xid {
                    tracing::debug!("XID mismatch, ignoring");
                    return Ok(Action::Wait(Duration::from_secs(5)));
                }
                if message.message_type() != Some(MessageType::Offer) {
                    tracing::debug!("Not an OFFER: {:?}", message.message_type());
                    return Ok(Action::Wait(Duration::from_secs(5)));
                }
                let Some(server) = message.option_ipv4(opt::SERVER_ID) else {
                    tracing::debug!("OFFER without a server identifier, ignoring");
                    return Ok(Action::Wait(Duration::from_secs(5)));
                };

                tracing::info!(
                    "Received DHCP OFFER of {} from server {}",
                    message.yiaddr,
                    server
                );
                self.offer = Some((message.yiaddr, server));
                self.state = DhcpV4State::Requesting;
                self.handle_requesting()
            }
            Event::Timeout => {
                tracing::warn!("Timeout in Selecting state, retrying discovery");
                self.state = DhcpV4State::Init;
                self.handle_init()
            }
        }
    }

    fn handle_requesting(&mut self) -> Result<Action, BeaconError> {
        let Some((offered, server)) = self.offer else {
            return Err(BeaconError::Critical(
                "No offer available for request".to_string(),
            ));
        };
        let request = self.builder.select(self.xid, server, offered)?;
        Ok(Action::Broadcast(request))
    }

    fn handle_requesting_response(&mut self, event: Event) -> Result<Action, BeaconError> {
        match event {
            Event::MessageReceived(message) => {
                if message.xid != self.xid {
                    return Ok(Action::Wait(Duration::from_secs(5)));
                }
                match message.message_type() {
                    Some(MessageType::Ack) => {
                        let lease = extract_lease(message);
                        self.state = DhcpV4State::Bound;
                        Ok(Action::StoreLease(lease))
                    }
                    Some(MessageType::Nak) => {
                        tracing::warn!("Received DHCP NAK, restarting discovery");
                        self.state = DhcpV4State::Init;
                        self.offer = None;
                        self.xid = xid::next_xid();
                        self.handle_init()
                    }
                    _ => Ok(Action::Wait(Duration::from_secs(5))),
                }
            }
            Event::Timeout => {
                tracing::warn!("Timeout waiting for DHCP ACK, retrying request");
                self.handle_requesting()
            }
        }
    }
}

fn extract_lease(message: &DhcpMessage) -> Lease {
    Lease {
        address: message.yiaddr,
        subnet_mask: message.option_ipv4(opt::SUBNET_MASK),
        routers: message.option_ipv4_list(opt::ROUTER),
        dns_servers: message.option_ipv4_list(opt::DNS_SERVER),
        lease_duration: message
            .option_u32(opt::LEASE_TIME)
            .map(|secs| Duration::from_secs(u64::from(secs))),
        renewal_time: message
            .option_u32(opt::RENEWAL_TIME)
            .map(|secs| Duration::from_secs(u64::from(secs))),
        server_identifier: message.option_ipv4(opt::SERVER_ID),
    }
}

impl DhcpStateMachine for DhcpV4Handler {
    fn state_name(&self) -> &'static str {
        match self.state {
            DhcpV4State::Init => "Init",
            DhcpV4State::Selecting => "Selecting",
            DhcpV4State::Requesting => "Requesting",
            DhcpV4State::Bound => "Bound",
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<Action, BeaconError> {
        tracing::debug!("Handling event {:?} in state {:?}", event, self.state);
        match self.state {
            DhcpV4State::Init => self.handle_init(),
            DhcpV4State::Selecting => self.handle_selecting(event),
            DhcpV4State::Requesting => self.handle_requesting_response(event),
            DhcpV4State::Bound => {
                tracing::info!("Client is in Bound state - lease is active");
                Ok(Action::Exit)
            }
        }
    }
}
