use std::str::FromStr;

use x25519_dalek::{PublicKey, StaticSecret};

use crate::awg::Key;

use super::{KeyError, KeyPair, KeyService};

/// In-process X25519, same results as `awg genkey | awg pubkey`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalKeys;

impl KeyPair {
    pub fn from_private(private: Key) -> Self {
        let secret = StaticSecret::from(private.to_bytes());
        let public = Key::from(PublicKey::from(&secret).to_bytes());

        KeyPair { private, public }
    }
}

/// Clamps the scalar the way `genkey` does.
fn clamp(mut bytes: [u8; 32]) -> [u8; 32] {
    bytes[0] &= 248;
    bytes[31] &= 127;
    bytes[31] |= 64;
    bytes
}

impl KeyService for LocalKeys {
    type Error = KeyError;

    async fn generate_keypair(&self) -> Result<KeyPair, Self::Error> {
        let private = Key::from(clamp(Key::random().to_bytes()));

        Ok(KeyPair::from_private(private))
    }

    async fn derive_public(&self, private: &str) -> Result<KeyPair, Self::Error> {
        let private = Key::from_str(private.trim())?;

        Ok(KeyPair::from_private(private))
    }

    async fn generate_psk(&self) -> Result<Key, Self::Error> {
        Ok(Key::random())
    }
}
