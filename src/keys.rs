use std::fmt;

use crate::awg::{DecodeError, Key};

pub mod cmd;
pub mod local;

pub const PUBLIC_KEY_PLACEHOLDER: &str = "Error getting PublicKey";

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub private: Key,
    pub public: Key,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public.to_string())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("key tool {0} fail: {1:?}")]
    CommandFail(String, Option<i32>),

    #[error("key decode error: {0}")]
    DecodeError(#[from] DecodeError),
}

/// Key pair and preshared key generation, backed by an external tool or
/// computed in process.
pub trait KeyService {
    type Error: fmt::Display;

    async fn generate_keypair(&self) -> Result<KeyPair, Self::Error>;
    async fn derive_public(&self, private: &str) -> Result<KeyPair, Self::Error>;
    async fn generate_psk(&self) -> Result<Key, Self::Error>;
}

/// Public key for display, or a placeholder when `private` does not derive.
pub async fn public_key_or_placeholder<K: KeyService>(keys: &K, private: &str) -> String {
    match keys.derive_public(private).await {
        Ok(pair) => pair.public.to_string(),
        Err(err) => {
            log::warn!("cannot derive public key: {err}");
            PUBLIC_KEY_PLACEHOLDER.to_string()
        }
    }
}

pub mod fake {
    use std::str::FromStr;

    use crate::awg::Key;

    use super::{KeyPair, KeyService};

    #[derive(Debug, thiserror::Error)]
    #[error("unknown private key")]
    pub struct UnknownKey;

    /// Hands out and recognises a fixed set of pairs.
    #[derive(Debug, Clone)]
    pub struct FixedKeys {
        pairs: Vec<KeyPair>,
        psk: Key,
    }

    impl FixedKeys {
        pub fn new(pairs: Vec<KeyPair>, psk: Key) -> Self {
            Self { pairs, psk }
        }
    }

    impl KeyService for FixedKeys {
        type Error = UnknownKey;

        async fn generate_keypair(&self) -> Result<KeyPair, Self::Error> {
            self.pairs.first().copied().ok_or(UnknownKey)
        }

        async fn derive_public(&self, private: &str) -> Result<KeyPair, Self::Error> {
            let private = Key::from_str(private.trim()).map_err(|_| UnknownKey)?;

            self.pairs
                .iter()
                .find(|p| p.private == private)
                .copied()
                .ok_or(UnknownKey)
        }

        async fn generate_psk(&self) -> Result<Key, Self::Error> {
            Ok(self.psk)
        }
    }
}
