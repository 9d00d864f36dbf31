//! Field shape checks shared by the parser and the form-facing commands.
//!
//! Every check treats an empty value as "unset" and accepts it.

use std::net::IpAddr;

pub const MTU_RANGE: (u64, u64) = (0, 8940);
pub const KEEPALIVE_RANGE: (u64, u64) = (0, 65535);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid Base64 key string")]
    InvalidKey,

    #[error("Invalid hexadecimal value")]
    InvalidHexMark,

    #[error("Expecting a non-negative integer")]
    NotAnInteger,

    #[error("Expecting a value between {0} and {1}")]
    OutOfRange(u64, u64),

    #[error("Expecting a valid IP address or prefix")]
    InvalidAddress,
}

pub type Validation = Result<(), ValidationError>;

/// Base64 shape of a 32 byte key: 43 alphabet characters and one `=` pad.
pub fn valid_key(value: &str) -> Validation {
    if value.is_empty() {
        return Ok(());
    }

    let bytes = value.as_bytes();
    if bytes.len() != 44 || bytes[43] != b'=' {
        return Err(ValidationError::InvalidKey);
    }

    if !bytes[..43]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
    {
        return Err(ValidationError::InvalidKey);
    }

    Ok(())
}

pub fn valid_uint(value: &str) -> Validation {
    parse_uint(value).map(|_| ())
}

pub fn valid_range(value: &str, lo: u64, hi: u64) -> Validation {
    match parse_uint(value)? {
        Some(n) if n < lo || n > hi => Err(ValidationError::OutOfRange(lo, hi)),
        _ => Ok(()),
    }
}

pub fn valid_port(value: &str) -> Validation {
    valid_range(value, 0, u16::MAX as u64)
}

/// `0x` followed by one to eight hex digits.
pub fn valid_hex_mark(value: &str) -> Validation {
    if value.is_empty() {
        return Ok(());
    }

    match value.strip_prefix("0x") {
        Some(digits)
            if (1..=8).contains(&digits.len())
                && digits.bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::InvalidHexMark),
    }
}

/// IPv4 or IPv6 address with an optional `/prefix` no longer than the
/// address itself.
pub fn valid_ipaddr(value: &str) -> Validation {
    if value.is_empty() {
        return Ok(());
    }

    let (ip, prefix) = match value.split_once('/') {
        Some((ip, prefix)) => (ip, Some(prefix)),
        None => (value, None),
    };

    let ip: IpAddr = ip.parse().map_err(|_| ValidationError::InvalidAddress)?;
    let max = if ip.is_ipv4() { 32 } else { 128 };

    match prefix {
        None => Ok(()),
        Some(p) if is_digits(p) && p.parse::<u8>().is_ok_and(|n| n <= max) => Ok(()),
        Some(_) => Err(ValidationError::InvalidAddress),
    }
}

/// Runs `check` over every entry of a list field and stops at the first
/// failure.
pub fn valid_each<S: AsRef<str>>(values: &[S], check: fn(&str) -> Validation) -> Validation {
    values.iter().try_for_each(|v| check(v.as_ref()))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_uint(value: &str) -> Result<Option<u64>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }

    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotAnInteger);
    }

    value
        .parse()
        .map(Some)
        .map_err(|_| ValidationError::NotAnInteger)
}
