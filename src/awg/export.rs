//! Client configuration for one peer of the local interface.
//!
//! The text is what the remote side imports: its own private key and
//! addresses under `[Interface]`, this interface as its only `[Peer]`. The
//! reduced variant drops the I1..I5 lines afterwards so that the two texts
//! never differ in anything else.

use super::{
    Endpoint,
    instance::InterfaceRecord,
    peer::{PeerRecord, default_allowed_ips},
    scan::escape_comment,
};

pub const DEFAULT_LISTEN_PORT: &str = "51820";
pub const PSK_NOT_USED: &str = "# PresharedKey not used";
pub const ENDPOINT_NOT_DEFINED: &str = "# Endpoint not defined";

#[derive(Debug, Clone)]
pub struct ClientExport<'a> {
    interface: &'a InterfaceRecord,
    public_key: String,
    peer: &'a PeerRecord,
    endpoint: Option<String>,
    allowed_ips: Vec<String>,
    addresses: Vec<String>,
    dns: Vec<String>,
}

impl<'a> ClientExport<'a> {
    /// `public_key` is the local interface's public key. Addresses default to
    /// the peer's allowed IPs, the routed ranges to everything.
    pub fn new(
        interface: &'a InterfaceRecord,
        public_key: impl Into<String>,
        peer: &'a PeerRecord,
    ) -> Self {
        Self {
            interface,
            public_key: public_key.into(),
            peer,
            endpoint: None,
            allowed_ips: default_allowed_ips(),
            addresses: peer.allowed_ips.clone(),
            dns: Vec::new(),
        }
    }

    /// Host the peer connects to; an empty host means none.
    pub fn endpoint(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.endpoint = (!host.is_empty()).then_some(host);
        self
    }

    pub fn allowed_ips(mut self, ips: Vec<String>) -> Self {
        self.allowed_ips = ips;
        self
    }

    pub fn addresses(mut self, addresses: Vec<String>) -> Self {
        self.addresses = addresses;
        self
    }

    pub fn dns(mut self, dns: Vec<String>) -> Self {
        self.dns = dns;
        self
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["[Interface]".to_string()];

        if !self.dns.is_empty() {
            lines.push(pair("DNS", &self.dns.join(", ")));
        }

        if let Some(key) = nonempty(&self.peer.private_key) {
            lines.push(pair("PrivateKey", key));
        }

        if !self.addresses.is_empty() {
            lines.push(pair("Address", &self.addresses.join(", ")));
        }

        if let Some(port) = nonempty(&self.peer.endpoint_port) {
            lines.push(pair("ListenPort", port));
        }

        for (param, value) in self.interface.obfs.iter() {
            lines.push(pair(param.label(), value));
        }

        lines.push(String::new());
        lines.push("[Peer]".to_string());
        lines.push(pair("PublicKey", &self.public_key));

        lines.push(match nonempty(&self.peer.preshared_key) {
            Some(psk) => pair("PresharedKey", psk),
            None => PSK_NOT_USED.to_string(),
        });

        lines.push(if self.allowed_ips.is_empty() {
            pair("AllowedIPs", &default_allowed_ips().join(", "))
        } else {
            pair("AllowedIPs", &self.allowed_ips.join(", "))
        });

        lines.push(match &self.endpoint {
            Some(host) => {
                let port = match self.interface.listen_port.as_str() {
                    "" => DEFAULT_LISTEN_PORT,
                    port => port,
                };
                pair("Endpoint", &Endpoint::new(host, port).to_string())
            }
            None => ENDPOINT_NOT_DEFINED.to_string(),
        });

        if let Some(keepalive) = nonempty(&self.peer.persistent_keepalive)
            .filter(|k| k.parse::<u64>().map_or(true, |n| n != 0))
        {
            lines.push(pair("PersistentKeepAlive", keepalive));
        }

        lines
    }

    /// Shown verbatim to the user.
    pub fn full_text(&self) -> String {
        self.lines().join("\n")
    }

    /// Handed to the QR renderer.
    pub fn reduced_text(&self) -> String {
        reduce(self.lines()).join("\n")
    }
}

/// `Key = Value` with `#` escaped so the scanner reads the value back whole.
fn pair(key: &str, value: &str) -> String {
    format!("{key} = {}", escape_comment(value))
}

fn nonempty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Matches `^I[1-5]\s*=`.
pub fn is_signature_line(line: &str) -> bool {
    let mut chars = line.chars();

    chars.next() == Some('I')
        && chars.next().is_some_and(|c| ('1'..='5').contains(&c))
        && chars.as_str().trim_start().starts_with('=')
}

pub fn reduce(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .filter(|line| !is_signature_line(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::awg::{Key, config::ParsedDocument, instance::ObfsParam};

    use super::*;

    fn server() -> InterfaceRecord {
        let mut iface = InterfaceRecord {
            private_key: Key::random().to_string(),
            listen_port: "51821".to_string(),
            ..Default::default()
        };
        iface.obfs.set(ObfsParam::Jc, "4");
        iface.obfs.set(ObfsParam::Jmin, "40");
        iface.obfs.set(ObfsParam::Jmax, "70");
        iface.obfs.set(ObfsParam::S1, "15");
        iface.obfs.set(ObfsParam::H1, "1234567");
        iface.obfs.set(ObfsParam::I1, "<b 0xc2000000011>");
        iface.obfs.set(ObfsParam::I5, "<r 16>");
        iface
    }

    #[test]
    fn test_full_export() {
        let iface = server();
        let server_pub = Key::random().to_string();
        let peer_priv = Key::random().to_string();
        let psk = Key::random().to_string();

        let peer = PeerRecord {
            public_key: Key::random().to_string(),
            private_key: Some(peer_priv.clone()),
            preshared_key: Some(psk.clone()),
            allowed_ips: vec!["10.8.0.2/32".to_string()],
            endpoint_port: Some("51900".to_string()),
            persistent_keepalive: Some("25".to_string()),
            ..Default::default()
        };

        let export = ClientExport::new(&iface, server_pub.clone(), &peer)
            .endpoint("2001:db8::1")
            .dns(vec!["10.8.0.1".to_string(), "1.1.1.1".to_string()]);

        assert_eq!(
            export.lines(),
            vec![
                "[Interface]".to_string(),
                "DNS = 10.8.0.1, 1.1.1.1".to_string(),
                format!("PrivateKey = {peer_priv}"),
                "Address = 10.8.0.2/32".to_string(),
                "ListenPort = 51900".to_string(),
                "Jc = 4".to_string(),
                "Jmin = 40".to_string(),
                "Jmax = 70".to_string(),
                "S1 = 15".to_string(),
                "H1 = 1234567".to_string(),
                "I1 = <b 0xc2000000011>".to_string(),
                "I5 = <r 16>".to_string(),
                String::new(),
                "[Peer]".to_string(),
                format!("PublicKey = {server_pub}"),
                format!("PresharedKey = {psk}"),
                "AllowedIPs = 0.0.0.0/0, ::/0".to_string(),
                "Endpoint = [2001:db8::1]:51821".to_string(),
                "PersistentKeepAlive = 25".to_string(),
            ]
        );
    }

    #[test]
    fn test_minimal_export() {
        let iface = InterfaceRecord::default();
        let peer = PeerRecord {
            public_key: "k".to_string(),
            persistent_keepalive: Some("0".to_string()),
            ..Default::default()
        };

        let text = ClientExport::new(&iface, "srv", &peer)
            .allowed_ips(vec![])
            .full_text();

        assert_eq!(
            text,
            "[Interface]\n\n[Peer]\nPublicKey = srv\n# PresharedKey not used\n\
             AllowedIPs = 0.0.0.0/0, ::/0\n# Endpoint not defined"
        );
    }

    #[test]
    fn test_endpoint_default_port() {
        let iface = InterfaceRecord::default();
        let peer = PeerRecord::default();

        let lines = ClientExport::new(&iface, "srv", &peer)
            .endpoint("vpn.example.com")
            .lines();

        assert!(lines.contains(&"Endpoint = vpn.example.com:51820".to_string()));
    }

    #[test]
    fn test_reduced_drops_signatures_only() {
        let iface = server();
        let peer = PeerRecord::default();
        let export = ClientExport::new(&iface, "srv", &peer).endpoint("203.0.113.7");

        let full = export.full_text();
        let reduced = export.reduced_text();

        assert!(full.lines().any(is_signature_line));
        assert!(!reduced.lines().any(is_signature_line));

        let expected: Vec<&str> = full.lines().filter(|l| !l.starts_with("I")).collect();
        assert_eq!(reduced.lines().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_signature_line_match() {
        assert!(is_signature_line("I1 = x"));
        assert!(is_signature_line("I5= x"));
        assert!(is_signature_line("I3\t= x"));
        assert!(!is_signature_line("I6 = x"));
        assert!(!is_signature_line("I = x"));
        assert!(!is_signature_line("H1 = 1"));
        assert!(!is_signature_line(" I1 = x"));
        assert!(!is_signature_line("I12 = x"));
    }

    #[test]
    fn test_export_reparses() {
        let iface = server();
        let server_pub = Key::random().to_string();
        let peer = PeerRecord {
            public_key: Key::random().to_string(),
            private_key: Some(Key::random().to_string()),
            preshared_key: Some(Key::random().to_string()),
            allowed_ips: vec!["10.8.0.7/32".to_string()],
            persistent_keepalive: Some("21".to_string()),
            ..Default::default()
        };
        let allowed = vec!["10.8.0.0/24".to_string(), "fd00::/64".to_string()];

        let export = ClientExport::new(&iface, server_pub.clone(), &peer)
            .endpoint("fd00::1")
            .allowed_ips(allowed.clone());

        let full = ParsedDocument::parse(&export.full_text());
        let remote = &full.peers[0];

        assert_eq!(remote.public_key, server_pub);
        assert_eq!(remote.allowed_ips, allowed);
        assert_eq!(remote.endpoint_host.as_deref(), Some("fd00::1"));
        assert_eq!(remote.endpoint_port.as_deref(), Some("51821"));
        assert_eq!(remote.persistent_keepalive, peer.persistent_keepalive);
        assert_eq!(remote.preshared_key, peer.preshared_key);
        assert_eq!(Some(full.interface.private_key.clone()), peer.private_key);
        assert_eq!(full.interface.addresses, peer.allowed_ips);
        assert_eq!(full.interface.obfs, iface.obfs);

        let reduced = ParsedDocument::parse(&export.reduced_text());
        assert_eq!(reduced.peers, full.peers);
        assert_eq!(reduced.interface.obfs.get(ObfsParam::I1), None);
        assert_eq!(reduced.interface.obfs.get(ObfsParam::Jc), Some("4"));
    }

    #[test]
    fn test_export_reparses_escaped_hash() {
        let doc = ParsedDocument::parse("[Interface]\nI2 = <b 0x01>\\#tag # note\nJc = 3\n");
        assert_eq!(doc.interface.obfs.get(ObfsParam::I2), Some("<b 0x01>#tag"));

        let peer = PeerRecord {
            public_key: Key::random().to_string(),
            ..Default::default()
        };
        let export = ClientExport::new(&doc.interface, Key::random().to_string(), &peer);

        assert!(export.lines().contains(&r"I2 = <b 0x01>\#tag".to_string()));

        let full = ParsedDocument::parse(&export.full_text());
        assert_eq!(full.interface.obfs, doc.interface.obfs);

        let reduced = ParsedDocument::parse(&export.reduced_text());
        assert_eq!(reduced.interface.obfs.get(ObfsParam::I2), None);
        assert_eq!(reduced.interface.obfs.get(ObfsParam::Jc), Some("3"));
    }
}
