//! Textual CIDR to bit-string conversion.
//!
//! The generation engine works exclusively on bit strings; this codec sits at
//! the boundary and is stateless. Rendering normalizes the address part to
//! the full 128 bits with trailing zeros before formatting.

use crate::trie::MAX_PREFIX_LEN;
use std::net::Ipv6Addr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("'{0}' is not in address/length CIDR form")]
    MissingLength(String),
    #[error("invalid IPv6 address '{0}'")]
    InvalidAddress(String),
    #[error("prefix length '{0}' is not an integer between 0 and {MAX_PREFIX_LEN}")]
    InvalidLength(String),
}

/// Parse a textual CIDR (`2001:db8::/32`) into its bit-string prefix.
///
/// The returned string holds exactly `length` characters of `0`/`1`,
/// truncating the address at the prefix length.
pub fn parse_cidr(cidr: &str) -> Result<String, CodecError> {
    let (address, length) = cidr
        .split_once('/')
        .ok_or_else(|| CodecError::MissingLength(cidr.to_string()))?;

    let address: Ipv6Addr = address
        .trim()
        .parse()
        .map_err(|_| CodecError::InvalidAddress(address.trim().to_string()))?;

    let length: usize = length
        .trim()
        .parse()
        .map_err(|_| CodecError::InvalidLength(length.trim().to_string()))?;
    if length > MAX_PREFIX_LEN {
        return Err(CodecError::InvalidLength(length.to_string()));
    }

    let value = u128::from(address);
    Ok((0..length)
        .map(|position| {
            if value >> (127 - position) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        })
        .collect())
}

/// Render a trie bit string as textual CIDR, zero-padded to 128 bits.
pub fn render_cidr(bits: &str) -> String {
    debug_assert!(bits.len() <= MAX_PREFIX_LEN);
    debug_assert!(bits.bytes().all(|b| b == b'0' || b == b'1'));

    let mut value: u128 = 0;
    for (position, byte) in bits.bytes().enumerate() {
        if byte == b'1' {
            value |= 1 << (127 - position);
        }
    }
    format!("{}/{}", Ipv6Addr::from(value), bits.len())
}
