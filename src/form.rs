//! Command line edits of the interface form and of single peer sections.
//!
//! Every edit is checked as a whole before anything is written, so a
//! rejected command leaves the records as they were. An empty value clears
//! an optional field.

use crate::{
    awg::{
        instance::{InterfaceRecord, ObfsParam},
        peer::PeerRecord,
        validate::{self, KEEPALIVE_RANGE, MTU_RANGE, Validation, ValidationError},
    },
    error::Error,
};

fn check(field: &'static str, res: Validation) -> Result<(), Error> {
    res.map_err(|err| Error::InvalidField(field, err))
}

fn check_opt(
    field: &'static str,
    value: &Option<String>,
    valid: impl Fn(&str) -> Validation,
) -> Result<(), Error> {
    match value {
        Some(v) => check(field, valid(v)),
        None => Ok(()),
    }
}

fn nonempty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// `NAME=VALUE` for one obfuscation parameter, name matched case-insensitively.
pub fn parse_param(s: &str) -> Result<(ObfsParam, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;

    let param = ObfsParam::from_key(name.trim())
        .ok_or_else(|| format!("unknown obfuscation parameter {:?}", name.trim()))?;

    Ok((param, value.trim().to_string()))
}

#[derive(Debug, Default, clap::Args)]
pub struct InterfaceFields {
    #[arg(long)]
    pub private_key: Option<String>,
    #[arg(long)]
    pub listen_port: Option<String>,
    #[arg(long)]
    pub mtu: Option<String>,
    #[arg(long)]
    pub fwmark: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub addresses: Option<Vec<String>>,
    #[arg(long, value_delimiter = ',')]
    pub dns: Option<Vec<String>>,

    /// Obfuscation parameter, e.g. `--param Jc=4` or `--param I1=` to clear
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(ObfsParam, String)>,
}

impl InterfaceFields {
    pub fn check(&self) -> Result<(), Error> {
        let (mtu_lo, mtu_hi) = MTU_RANGE;

        check_opt("PrivateKey", &self.private_key, validate::valid_key)?;
        check_opt("ListenPort", &self.listen_port, validate::valid_port)?;
        check_opt("MTU", &self.mtu, |v| validate::valid_range(v, mtu_lo, mtu_hi))?;
        check_opt("FwMark", &self.fwmark, validate::valid_hex_mark)?;

        if let Some(addresses) = &self.addresses {
            check("Address", validate::valid_each(addresses, validate::valid_ipaddr))?;
        }
        if let Some(dns) = &self.dns {
            check("DNS", validate::valid_each(dns, validate::valid_ipaddr))?;
        }

        for (param, value) in self.params.iter().filter(|(p, _)| p.is_numeric()) {
            check(param.label(), validate::valid_uint(value))?;
        }

        Ok(())
    }

    /// Checks, then writes the given fields into `iface`.
    pub fn apply(self, iface: &mut InterfaceRecord) -> Result<(), Error> {
        self.check()?;

        if let Some(v) = self.private_key {
            iface.private_key = v;
        }
        if let Some(v) = self.listen_port {
            iface.listen_port = v;
        }
        if let Some(v) = self.mtu {
            iface.mtu = v;
        }
        if let Some(v) = self.fwmark {
            iface.fwmark = v;
        }
        if let Some(v) = self.addresses {
            iface.addresses = v;
        }
        if let Some(v) = self.dns {
            iface.dns = v;
        }

        for (param, value) in self.params {
            iface.obfs.set(param, value);
        }

        Ok(())
    }
}

#[derive(Debug, Default, clap::Args)]
pub struct PeerFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub public_key: Option<String>,
    #[arg(long)]
    pub private_key: Option<String>,
    #[arg(long)]
    pub preshared_key: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub allowed_ips: Option<Vec<String>>,
    #[arg(long)]
    pub endpoint_host: Option<String>,
    #[arg(long)]
    pub endpoint_port: Option<String>,
    #[arg(long)]
    pub keepalive: Option<String>,
}

impl PeerFields {
    pub fn check(&self) -> Result<(), Error> {
        let (ka_lo, ka_hi) = KEEPALIVE_RANGE;

        // the one field a peer cannot go without
        if self.public_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(Error::InvalidField("PublicKey", ValidationError::InvalidKey));
        }

        check_opt("PublicKey", &self.public_key, validate::valid_key)?;
        check_opt("PrivateKey", &self.private_key, validate::valid_key)?;
        check_opt("PresharedKey", &self.preshared_key, validate::valid_key)?;
        check_opt("EndpointPort", &self.endpoint_port, validate::valid_port)?;
        check_opt("PersistentKeepalive", &self.keepalive, |v| {
            validate::valid_range(v, ka_lo, ka_hi)
        })?;

        if let Some(ips) = &self.allowed_ips {
            check("AllowedIPs", validate::valid_each(ips, validate::valid_ipaddr))?;
        }

        Ok(())
    }

    /// Checks, then writes the given fields into `peer`.
    pub fn apply(self, peer: &mut PeerRecord) -> Result<(), Error> {
        self.check()?;

        if let Some(v) = self.public_key {
            peer.public_key = v;
        }
        if let Some(v) = self.description {
            peer.description = nonempty(v);
        }
        if let Some(v) = self.private_key {
            peer.private_key = nonempty(v);
        }
        if let Some(v) = self.preshared_key {
            peer.preshared_key = nonempty(v);
        }
        if let Some(v) = self.allowed_ips {
            peer.allowed_ips = v;
        }
        if let Some(v) = self.endpoint_host {
            peer.endpoint_host = nonempty(v);
        }
        if let Some(v) = self.endpoint_port {
            peer.endpoint_port = nonempty(v);
        }
        if let Some(v) = self.keepalive {
            peer.persistent_keepalive = nonempty(v);
        }

        Ok(())
    }
}
