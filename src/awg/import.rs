//! Applying a pasted configuration to an interface and its peer sections.
//!
//! Two modes exist. A full import copies interface fields into the form
//! state and merges every valid peer, replacing stored peers with the same
//! public key. A peer import appends the first valid peer of the document as
//! one new section. Both check the document before touching anything, so a
//! rejected import leaves the target as it was.

use crate::{
    keys::KeyService,
    store::{SectionId, SectionStore, StoreError},
};

use super::{
    config::{FieldIssue, ParsedDocument},
    instance::InterfaceRecord,
    peer::PeerRecord,
};

pub const IMPORTED_PEER_DESCRIPTION: &str = "Imported peer configuration";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Empty configuration")]
    EmptyConfiguration,

    #[error("No valid parameters found in configuration")]
    NoValidParameters,

    #[error("No valid [Peer] section with PublicKey found.")]
    NoValidPeer,

    #[error("store error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    NoValidPeers,
    Field(FieldIssue),
    DerivationFailed(String),
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportWarning::NoValidPeers => {
                write!(f, "No peers with PublicKey found; peers were not imported.")
            }
            ImportWarning::Field(issue) => write!(f, "{issue}"),
            ImportWarning::DerivationFailed(err) => {
                write!(f, "cannot derive public key from PrivateKey: {err}")
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Interface fields written into the form state.
    pub applied: Vec<&'static str>,
    pub removed: Vec<SectionId>,
    pub added: Vec<SectionId>,
    /// Public key derived from the document's own PrivateKey (peer mode).
    pub derived_public_key: Option<String>,
    pub warnings: Vec<ImportWarning>,
}

fn parse_nonempty(text: &str) -> Result<ParsedDocument, ImportError> {
    if text.trim().is_empty() {
        return Err(ImportError::EmptyConfiguration);
    }

    Ok(ParsedDocument::parse(text))
}

/// Copy of `peer` as it is written into a new section.
fn imported(peer: &PeerRecord) -> PeerRecord {
    PeerRecord {
        public_key: peer.public_key.trim().to_string(),
        preshared_key: peer.preshared_key.clone(),
        allowed_ips: peer.allowed_ips.clone(),
        endpoint_host: peer.endpoint_host.clone(),
        endpoint_port: peer.endpoint_port.clone(),
        persistent_keepalive: peer.persistent_keepalive.clone(),
        description: Some(IMPORTED_PEER_DESCRIPTION.to_string()),
        ..Default::default()
    }
}

/// Valid peers with one entry per public key. A later section with the same
/// key wins but keeps the position of the first.
fn merged_peers(doc: &ParsedDocument) -> Vec<PeerRecord> {
    let mut peers: Vec<PeerRecord> = Vec::new();

    for peer in doc.valid_peers().map(imported) {
        match peers.iter_mut().find(|p| p.public_key == peer.public_key) {
            Some(existing) => {
                log::debug!("duplicate [Peer] {} in document", peer.public_key);
                *existing = peer;
            }
            None => peers.push(peer),
        }
    }

    peers
}

/// Writes only present, non-empty fields; returns the names written.
fn apply_interface(from: &InterfaceRecord, to: &mut InterfaceRecord) -> Vec<&'static str> {
    let mut applied = Vec::new();

    if !from.private_key.is_empty() {
        to.private_key = from.private_key.clone();
        applied.push("PrivateKey");
    }

    if !from.listen_port.is_empty() {
        to.listen_port = from.listen_port.clone();
        applied.push("ListenPort");
    }

    if !from.addresses.is_empty() {
        to.addresses = from.addresses.clone();
        applied.push("Address");
    }

    if !from.dns.is_empty() {
        to.dns = from.dns.clone();
        applied.push("DNS");
    }

    for (param, value) in from.obfs.iter() {
        to.obfs.set(param, value);
        applied.push(param.label());
    }

    applied
}

fn field_warnings(doc: &ParsedDocument) -> Vec<ImportWarning> {
    doc.issues().into_iter().map(ImportWarning::Field).collect()
}

pub fn import_full<S: SectionStore>(
    text: &str,
    target: &mut InterfaceRecord,
    store: &mut S,
) -> Result<ImportReport, ImportError> {
    let doc = parse_nonempty(text)?;
    let peers = merged_peers(&doc);

    if !doc.interface.is_useful() && peers.is_empty() {
        return Err(ImportError::NoValidParameters);
    }

    let mut report = ImportReport {
        warnings: field_warnings(&doc),
        ..Default::default()
    };

    if !doc.peers.is_empty() && peers.is_empty() {
        log::warn!("{} [Peer] sections without PublicKey", doc.peers.len());
        report.warnings.push(ImportWarning::NoValidPeers);
    }

    for id in store.sections() {
        let replaced = store
            .get(&id)
            .is_some_and(|old| peers.iter().any(|p| p.public_key == old.public_key));

        if replaced {
            log::warn!("replacing peer section {id}");
            store.remove(&id)?;
            report.removed.push(id);
        }
    }

    for peer in peers {
        log::info!("importing peer {}", peer.public_key);
        report.added.push(store.add(peer)?);
    }

    // interface fields go last so a store failure leaves the form untouched
    report.applied = apply_interface(&doc.interface, target);

    log::info!(
        "imported interface fields [{}], {} peers",
        report.applied.join(", "),
        report.added.len()
    );

    Ok(report)
}

/// The document's own PrivateKey is only run through the key service; the
/// outcome is reported and never blocks the import.
pub async fn import_peer<S: SectionStore, K: KeyService>(
    text: &str,
    store: &mut S,
    keys: &K,
) -> Result<ImportReport, ImportError> {
    let doc = parse_nonempty(text)?;
    let peer = doc
        .valid_peers()
        .next()
        .map(imported)
        .ok_or(ImportError::NoValidPeer)?;

    let mut report = ImportReport {
        warnings: field_warnings(&doc),
        ..Default::default()
    };

    if !doc.interface.private_key.is_empty() {
        match keys.derive_public(&doc.interface.private_key).await {
            Ok(pair) => {
                let derived = pair.public.to_string();
                if derived != peer.public_key {
                    log::info!(
                        "document PrivateKey derives {derived}, storing declared {}",
                        peer.public_key
                    );
                }
                report.derived_public_key = Some(derived);
            }
            Err(err) => {
                log::warn!("cannot derive public key: {err}");
                report
                    .warnings
                    .push(ImportWarning::DerivationFailed(err.to_string()));
            }
        }
    }

    log::info!("importing peer {}", peer.public_key);
    report.added.push(store.add(peer)?);

    Ok(report)
}
