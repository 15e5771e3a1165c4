//! TLV option encoding for the fixed-capacity options area.
//!
//! Every append is bounds-checked against the remaining capacity and keeps
//! the area terminated by the END marker. Overrunning the area is an error,
//! never a silent overflow.

use super::opt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionError {
    #[error("options area full: option {code} needs {needed} bytes, {available} available")]
    CapacityExceeded {
        code: u8,
        needed: usize,
        available: usize,
    },

    #[error("option {code} value of {len} bytes exceeds the 255-byte option limit")]
    ValueTooLong { code: u8, len: usize },

    #[error("options area is not terminated by an end marker")]
    Unterminated,
}

/// One entry of the static option-capability table.
pub struct OptionSpec {
    pub code: u8,
    /// Whether the client asks the server for this option in its
    /// parameter-request-list.
    pub requested: bool,
}

/// Every option code the client knows about, in the order it requests them.
pub const OPTION_TABLE: &[OptionSpec] = &[
    OptionSpec { code: opt::SUBNET_MASK, requested: true },
    OptionSpec { code: opt::TIME_OFFSET, requested: false },
    OptionSpec { code: opt::ROUTER, requested: true },
    OptionSpec { code: opt::TIME_SERVER, requested: false },
    OptionSpec { code: opt::NAME_SERVER, requested: false },
    OptionSpec { code: opt::DNS_SERVER, requested: true },
    OptionSpec { code: opt::LOG_SERVER, requested: false },
    OptionSpec { code: opt::LPR_SERVER, requested: false },
    OptionSpec { code: opt::HOST_NAME, requested: true },
    OptionSpec { code: opt::DOMAIN_NAME, requested: true },
    OptionSpec { code: opt::ROOT_PATH, requested: false },
    OptionSpec { code: opt::MTU, requested: false },
    OptionSpec { code: opt::BROADCAST, requested: true },
    OptionSpec { code: opt::NTP_SERVER, requested: false },
    OptionSpec { code: opt::WINS_SERVER, requested: false },
    OptionSpec { code: opt::LEASE_TIME, requested: false },
];

/// Number of table entries flagged `requested`, and therefore the exact
/// length of every parameter-request-list this client emits.
pub const fn requested_count() -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < OPTION_TABLE.len() {
        if OPTION_TABLE[i].requested {
            n += 1;
        }
        i += 1;
    }
    n
}

// The request list (code + length + entries + END) must fit an empty
// options area.
const _: () = assert!(requested_count() + 3 <= super::message::OPTIONS_CAPACITY);

/// Returns the offset of the END marker, walking TLV records and skipping
/// padding. An area with no terminator is malformed.
pub fn end_offset(options: &[u8]) -> Result<usize, OptionError> {
    let mut i = 0;
    while i < options.len() {
        match options[i] {
            opt::END => return Ok(i),
            opt::PADDING => i += 1,
            _ => {
                if i + 1 >= options.len() {
                    break;
                }
                i += 2 + options[i + 1] as usize;
            }
        }
    }
    Err(OptionError::Unterminated)
}

/// Appends one TLV record forward of the current END marker and writes a
/// new END immediately after it.
pub fn append(options: &mut [u8], code: u8, data: &[u8]) -> Result<(), OptionError> {
    // The length byte cannot represent more; a longer value would wrap it
    // and leave a walker landing mid-data.
    if data.len() > u8::MAX as usize {
        return Err(OptionError::ValueTooLong {
            code,
            len: data.len(),
        });
    }
    let end = end_offset(options)?;
    let needed = 2 + data.len();
    // One byte is reserved for the trailing END marker.
    if end + needed + 1 > options.len() {
        return Err(OptionError::CapacityExceeded {
            code,
            needed,
            available: options.len().saturating_sub(end + 1),
        });
    }
    options[end] = code;
    options[end + 1] = data.len() as u8;
    options[end + 2..end + 2 + data.len()].copy_from_slice(data);
    options[end + needed] = opt::END;
    Ok(())
}

/// Appends a simple 32-bit option in network byte order.
pub fn append_u32(options: &mut [u8], code: u8, value: u32) -> Result<(), OptionError> {
    append(options, code, &value.to_be_bytes())
}

/// Returns the data of the first option with `code`, if present and intact.
pub fn lookup(options: &[u8], code: u8) -> Option<&[u8]> {
    let mut i = 0;
    while i < options.len() {
        match options[i] {
            opt::END => return None,
            opt::PADDING => i += 1,
            c => {
                if i + 1 >= options.len() {
                    return None;
                }
                let len = options[i + 1] as usize;
                if i + 2 + len > options.len() {
                    return None;
                }
                if c == code {
                    return Some(&options[i + 2..i + 2 + len]);
                }
                i += 2 + len;
            }
        }
    }
    None
}
