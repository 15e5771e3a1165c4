use crate::network::SocketError;
use crate::v4::{message::DecodeError, options::OptionError};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Socket operation failed")]
    Socket(#[from] SocketError),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("Message build failed")]
    Build(#[from] OptionError),

    #[error("Message decode failed")]
    Decode(#[from] DecodeError),

    #[error("Failed to parse MAC address: {0}")]
    MacParse(String),

    #[error("State machine reached a critical failure: {0}")]
    Critical(String),
}
