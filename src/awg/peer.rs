use bincode::{Decode, Encode};

use super::{
    Endpoint,
    validate::{self, KEEPALIVE_RANGE, ValidationError},
};

pub const DEFAULT_ALLOWED_IPS: [&str; 2] = ["0.0.0.0/0", "::/0"];

pub fn default_allowed_ips() -> Vec<String> {
    DEFAULT_ALLOWED_IPS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PeerRecord {
    // PublicKey
    pub public_key: String,

    // only known when the local side generated the peer's keys
    pub private_key: Option<String>,

    // PresharedKey
    pub preshared_key: Option<String>,

    // AllowedIPs
    pub allowed_ips: Vec<String>,

    pub endpoint_host: Option<String>,
    pub endpoint_port: Option<String>,

    // PersistentKeepalive
    pub persistent_keepalive: Option<String>,

    pub description: Option<String>,
    pub disabled: bool,
}

impl PeerRecord {
    pub fn is_valid(&self) -> bool {
        !self.public_key.trim().is_empty()
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        match (&self.endpoint_host, &self.endpoint_port) {
            (Some(host), Some(port)) => Some(Endpoint::new(host, port)),
            _ => None,
        }
    }

    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint_host = Some(endpoint.host);
        self.endpoint_port = Some(endpoint.port);
    }

    pub fn issues(&self) -> Vec<(&'static str, ValidationError)> {
        let (ka_lo, ka_hi) = KEEPALIVE_RANGE;
        let opt = |v: &Option<String>| v.as_deref().unwrap_or_default().to_string();

        [
            ("PublicKey", validate::valid_key(&self.public_key)),
            ("PrivateKey", validate::valid_key(&opt(&self.private_key))),
            ("PresharedKey", validate::valid_key(&opt(&self.preshared_key))),
            ("EndpointPort", validate::valid_port(&opt(&self.endpoint_port))),
            (
                "PersistentKeepalive",
                validate::valid_range(&opt(&self.persistent_keepalive), ka_lo, ka_hi),
            ),
        ]
        .into_iter()
        .filter_map(|(field, res)| res.err().map(|err| (field, err)))
        .collect()
    }
}
