use std::collections::BTreeMap;

use bincode::{Decode, Encode};

use super::validate::{self, MTU_RANGE, ValidationError};

/// Obfuscation parameters of the interface, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub enum ObfsParam {
    Jc,
    Jmin,
    Jmax,
    S1,
    S2,
    S3,
    S4,
    H1,
    H2,
    H3,
    H4,
    I1,
    I2,
    I3,
    I4,
    I5,
}

impl ObfsParam {
    pub const ALL: [ObfsParam; 16] = [
        ObfsParam::Jc,
        ObfsParam::Jmin,
        ObfsParam::Jmax,
        ObfsParam::S1,
        ObfsParam::S2,
        ObfsParam::S3,
        ObfsParam::S4,
        ObfsParam::H1,
        ObfsParam::H2,
        ObfsParam::H3,
        ObfsParam::H4,
        ObfsParam::I1,
        ObfsParam::I2,
        ObfsParam::I3,
        ObfsParam::I4,
        ObfsParam::I5,
    ];

    /// Name as written in configuration text.
    pub fn label(self) -> &'static str {
        match self {
            ObfsParam::Jc => "Jc",
            ObfsParam::Jmin => "Jmin",
            ObfsParam::Jmax => "Jmax",
            ObfsParam::S1 => "S1",
            ObfsParam::S2 => "S2",
            ObfsParam::S3 => "S3",
            ObfsParam::S4 => "S4",
            ObfsParam::H1 => "H1",
            ObfsParam::H2 => "H2",
            ObfsParam::H3 => "H3",
            ObfsParam::H4 => "H4",
            ObfsParam::I1 => "I1",
            ObfsParam::I2 => "I2",
            ObfsParam::I3 => "I3",
            ObfsParam::I4 => "I4",
            ObfsParam::I5 => "I5",
        }
    }

    /// Lookup by lower-cased key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(key))
    }

    /// J, S and H take unsigned integers; I1..I5 are opaque strings.
    pub fn is_numeric(self) -> bool {
        !self.is_signature()
    }

    /// I1..I5 carry packet signatures that are too long for a QR code.
    pub fn is_signature(self) -> bool {
        matches!(
            self,
            ObfsParam::I1 | ObfsParam::I2 | ObfsParam::I3 | ObfsParam::I4 | ObfsParam::I5
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ObfsParams(BTreeMap<ObfsParam, String>);

impl ObfsParams {
    pub fn get(&self, param: ObfsParam) -> Option<&str> {
        self.0.get(&param).map(String::as_str)
    }

    /// An empty value clears the parameter; there is no separate disabled state.
    pub fn set(&mut self, param: ObfsParam, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.0.remove(&param);
        } else {
            self.0.insert(param, value);
        }
    }

    /// Present parameters in export order.
    pub fn iter(&self) -> impl Iterator<Item = (ObfsParam, &str)> {
        self.0.iter().map(|(p, v)| (*p, v.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(ObfsParam, S)> for ObfsParams {
    fn from_iter<T: IntoIterator<Item = (ObfsParam, S)>>(iter: T) -> Self {
        let mut params = ObfsParams::default();
        for (param, value) in iter {
            params.set(param, value);
        }
        params
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct InterfaceRecord {
    // PrivateKey
    pub private_key: String,

    // ListenPort
    pub listen_port: String,

    // Address
    pub addresses: Vec<String>,

    // DNS
    pub dns: Vec<String>,

    // Jc .. I5
    pub obfs: ObfsParams,

    // form only, never read from or written to text
    pub mtu: String,

    // form only, never read from or written to text
    pub fwmark: String,
}

impl InterfaceRecord {
    /// Worth importing on its own, even without peers.
    pub fn is_useful(&self) -> bool {
        !self.private_key.is_empty() || !self.addresses.is_empty() || !self.listen_port.is_empty()
    }

    pub fn issues(&self) -> Vec<(&'static str, ValidationError)> {
        let (mtu_lo, mtu_hi) = MTU_RANGE;
        let mut issues = Vec::new();

        let checks = [
            ("PrivateKey", validate::valid_key(&self.private_key)),
            ("ListenPort", validate::valid_port(&self.listen_port)),
            ("MTU", validate::valid_range(&self.mtu, mtu_lo, mtu_hi)),
            ("FwMark", validate::valid_hex_mark(&self.fwmark)),
        ];

        for (field, res) in checks {
            if let Err(err) = res {
                issues.push((field, err));
            }
        }

        for (param, value) in self.obfs.iter().filter(|(p, _)| p.is_numeric()) {
            if let Err(err) = validate::valid_uint(value) {
                issues.push((param.label(), err));
            }
        }

        issues
    }
}
