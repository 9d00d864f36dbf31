use std::str::FromStr;

use super::{
    Endpoint,
    instance::{InterfaceRecord, ObfsParam},
    peer::{PeerRecord, default_allowed_ips},
    scan::{RawDocument, Section, scan},
    validate::ValidationError,
};

/// One interface and its peers as read from a single configuration text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub interface: InterfaceRecord,
    pub peers: Vec<PeerRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionRef {
    Interface,
    Peer(usize),
}

impl std::fmt::Display for SectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionRef::Interface => write!(f, "[Interface]"),
            SectionRef::Peer(idx) => write!(f, "[Peer] #{}", idx + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub section: SectionRef,
    pub field: &'static str,
    pub error: ValidationError,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.section, self.field, self.error)
    }
}

impl ParsedDocument {
    pub fn parse(text: &str) -> Self {
        scan(text).into()
    }

    pub fn valid_peers(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.iter().filter(|p| p.is_valid())
    }

    /// Shape problems of every recognized field. Parsing never fails on them.
    pub fn issues(&self) -> Vec<FieldIssue> {
        let iface = self
            .interface
            .issues()
            .into_iter()
            .map(|(field, error)| FieldIssue {
                section: SectionRef::Interface,
                field,
                error,
            });

        let peers = self.peers.iter().enumerate().flat_map(|(idx, peer)| {
            peer.issues().into_iter().map(move |(field, error)| FieldIssue {
                section: SectionRef::Peer(idx),
                field,
                error,
            })
        });

        iface.chain(peers).collect()
    }
}

impl From<RawDocument> for ParsedDocument {
    fn from(raw: RawDocument) -> Self {
        ParsedDocument {
            interface: InterfaceRecord::from(&raw.interface),
            peers: raw.peers.iter().map(PeerRecord::from).collect(),
        }
    }
}

impl From<&Section> for InterfaceRecord {
    fn from(section: &Section) -> Self {
        let mut iface = InterfaceRecord::default();

        for (key, value) in section.iter() {
            match key.parse::<PropKind>() {
                Ok(PropKind::PrivateKey) => iface.private_key = value.to_string(),
                Ok(PropKind::ListenPort) => iface.listen_port = value.to_string(),
                Ok(PropKind::Address) => iface.addresses = split_list(value),
                Ok(PropKind::Dns) => iface.dns = split_list(value),
                Ok(PropKind::Obfs(param)) => iface.obfs.set(param, value),
                _ => log::debug!("ignoring interface key {key}"),
            }
        }

        iface
    }
}

impl From<&Section> for PeerRecord {
    fn from(section: &Section) -> Self {
        let mut peer = PeerRecord {
            allowed_ips: default_allowed_ips(),
            ..Default::default()
        };

        for (key, value) in section.iter() {
            match key.parse::<PropKind>() {
                Ok(PropKind::PublicKey) => peer.public_key = value.to_string(),
                Ok(PropKind::PresharedKey) => peer.preshared_key = Some(value.to_string()),
                Ok(PropKind::AllowedIps) => peer.allowed_ips = split_list(value),
                Ok(PropKind::PersistentKeepalive) => {
                    peer.persistent_keepalive = Some(value.to_string())
                }
                Ok(PropKind::Endpoint) => match Endpoint::split(value) {
                    Some(endpoint) => peer.set_endpoint(endpoint),
                    None => log::debug!("endpoint {value:?} is neither host:port nor [addr]:port"),
                },
                _ => log::debug!("ignoring peer key {key}"),
            }
        }

        peer
    }
}

/// Splits on runs of commas and spaces.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ' '])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

enum PropKind {
    PrivateKey,
    ListenPort,
    Address,
    Dns,
    Obfs(ObfsParam),
    PublicKey,
    PresharedKey,
    AllowedIps,
    Endpoint,
    PersistentKeepalive,
    Unknown,
}

impl FromStr for PropKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "privatekey" => PropKind::PrivateKey,
            "listenport" => PropKind::ListenPort,
            "address" => PropKind::Address,
            "dns" => PropKind::Dns,
            "publickey" => PropKind::PublicKey,
            "presharedkey" => PropKind::PresharedKey,
            "allowedips" => PropKind::AllowedIps,
            "endpoint" => PropKind::Endpoint,
            "persistentkeepalive" => PropKind::PersistentKeepalive,
            _ => ObfsParam::from_key(s).map_or(PropKind::Unknown, PropKind::Obfs),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::awg::{Key, instance::ObfsParams};

    use super::*;

    #[test]
    fn test_parse_config() {
        let priv_key = Key::random();
        let srv_key = Key::random();
        let psk = Key::random();
        let phone_key = Key::random();

        let cfg = format!(
            "[Interface]
PrivateKey = {priv_key}
Address = 10.8.0.2/32, fd00::2/128
DNS = 1.1.1.1,9.9.9.9
ListenPort = 51822
MTU = 1380
Jc = 4
Jmin = 40
Jmax = 70
S1 = 0
S2 = 0
H1 = 1
H2 = 2
H3 = 3
H4 = 4
I1 = <b 0xc10000000108>

[Peer] # Server
PublicKey = {srv_key}
PresharedKey = {psk}
Endpoint = example.com:51821
AllowedIPs = 0.0.0.0/0 ,  ::/0
PersistentKeepalive = 25

[Peer] # Phone
PublicKey = {phone_key}
Endpoint = [2001:db8::1]:51820
"
        );

        let doc = ParsedDocument::parse(&cfg);

        let obfs: ObfsParams = [
            (ObfsParam::Jc, "4"),
            (ObfsParam::Jmin, "40"),
            (ObfsParam::Jmax, "70"),
            (ObfsParam::S1, "0"),
            (ObfsParam::S2, "0"),
            (ObfsParam::H1, "1"),
            (ObfsParam::H2, "2"),
            (ObfsParam::H3, "3"),
            (ObfsParam::H4, "4"),
            (ObfsParam::I1, "<b 0xc10000000108>"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            doc,
            ParsedDocument {
                interface: InterfaceRecord {
                    private_key: priv_key.to_string(),
                    listen_port: "51822".to_string(),
                    addresses: vec!["10.8.0.2/32".to_string(), "fd00::2/128".to_string()],
                    dns: vec!["1.1.1.1".to_string(), "9.9.9.9".to_string()],
                    obfs,
                    mtu: String::new(),
                    fwmark: String::new(),
                },
                peers: vec![
                    PeerRecord {
                        public_key: srv_key.to_string(),
                        preshared_key: Some(psk.to_string()),
                        allowed_ips: vec!["0.0.0.0/0".to_string(), "::/0".to_string()],
                        endpoint_host: Some("example.com".to_string()),
                        endpoint_port: Some("51821".to_string()),
                        persistent_keepalive: Some("25".to_string()),
                        ..Default::default()
                    },
                    PeerRecord {
                        public_key: phone_key.to_string(),
                        allowed_ips: default_allowed_ips(),
                        endpoint_host: Some("2001:db8::1".to_string()),
                        endpoint_port: Some("51820".to_string()),
                        ..Default::default()
                    },
                ]
            }
        );
        assert_eq!(doc.issues(), vec![]);
    }

    #[test]
    fn test_lists_absent_are_empty() {
        let doc = ParsedDocument::parse("[Interface]\nPrivateKey = x\n");

        assert!(doc.interface.addresses.is_empty());
        assert!(doc.interface.dns.is_empty());
        assert!(doc.peers.is_empty());
    }

    #[test]
    fn test_unparsable_endpoint_left_unset() {
        let doc = ParsedDocument::parse("[Peer]\nPublicKey = k\nEndpoint = novalidformat\n");

        assert_eq!(doc.peers[0].endpoint_host, None);
        assert_eq!(doc.peers[0].endpoint_port, None);
    }

    #[test]
    fn test_invalid_peers_are_kept() {
        let doc = ParsedDocument::parse("[Peer]\nAllowedIPs = 10.0.0.0/8\n[Peer]\nPublicKey = k\n");

        assert_eq!(doc.peers.len(), 2);
        assert_eq!(doc.peers[0].allowed_ips, vec!["10.0.0.0/8".to_string()]);
        assert_eq!(doc.valid_peers().count(), 1);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("10.0.0.1/32,, 10.0.0.2/32  10.0.0.3/32,"),
            vec!["10.0.0.1/32", "10.0.0.2/32", "10.0.0.3/32"]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_issues_reported_per_section() {
        let doc = ParsedDocument::parse(
            "[Interface]\nListenPort = 700000\nH1 = abc\n[Peer]\nPublicKey = short\n",
        );

        assert_eq!(
            doc.issues(),
            vec![
                FieldIssue {
                    section: SectionRef::Interface,
                    field: "ListenPort",
                    error: ValidationError::OutOfRange(0, 65535),
                },
                FieldIssue {
                    section: SectionRef::Interface,
                    field: "H1",
                    error: ValidationError::NotAnInteger,
                },
                FieldIssue {
                    section: SectionRef::Peer(0),
                    field: "PublicKey",
                    error: ValidationError::InvalidKey,
                },
            ]
        );
        assert_eq!(
            doc.issues()[2].to_string(),
            "[Peer] #1 PublicKey: Invalid Base64 key string"
        );
    }
}
