use base64::prelude::*;
use std::str::FromStr;

pub mod config;
pub mod export;
pub mod import;
pub mod instance;
pub mod peer;
pub mod scan;
pub mod validate;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid key length {0} (expected 32 bytes)")]
    Length(usize),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key([u8; 32]);

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Key {
    fn from(bytes: [u8; 32]) -> Self {
        Key(bytes)
    }
}

impl FromStr for Key {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64_STANDARD.decode(s)?;
        let inner: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| DecodeError::Length(bytes.len()))?;

        Ok(Key(inner))
    }
}

impl Key {
    pub fn random() -> Key {
        Key(rand::random())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", BASE64_STANDARD.encode(self.0))
    }
}

/// Host and port of a peer endpoint, kept as the strings they were written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// Splits `[v6-literal]:port` or `host:port`, in that order.
    ///
    /// The generic form takes everything up to the last colon as the host,
    /// so an unbracketed IPv6 literal followed by a port is still accepted.
    pub fn split(s: &str) -> Option<Self> {
        if let Some((host, port)) = s.strip_prefix('[').and_then(|rest| rest.split_once("]:")) {
            let literal = !host.is_empty()
                && host.bytes().all(|b| b.is_ascii_hexdigit() || b == b':');

            if literal && is_port(port) {
                return Some(Self::new(host, port));
            }
        }

        let (host, port) = s.rsplit_once(':')?;
        (!host.is_empty() && is_port(port)).then(|| Self::new(host, port))
    }
}

fn is_port(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
