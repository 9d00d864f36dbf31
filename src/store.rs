use std::{fs, io, path::Path};

use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration},
};

use crate::{
    awg::{instance::InterfaceRecord, peer::PeerRecord},
    error::Error,
};

const BINCODE_CONFIG: Configuration<BigEndian> = bincode::config::standard().with_big_endian();

/// Name of a peer section in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct SectionId(String);

impl SectionId {
    pub fn generate() -> Self {
        SectionId(format!("cfg{}", uuid::Uuid::new_v4().simple()))
    }
}

impl std::str::FromStr for SectionId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SectionId(s.to_string()))
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no such section: {0}")]
    UnknownSection(SectionId),
}

/// Named peer sections of one interface.
pub trait SectionStore {
    fn sections(&self) -> Vec<SectionId>;
    fn get(&self, id: &SectionId) -> Option<&PeerRecord>;
    fn set(&mut self, id: &SectionId, peer: PeerRecord) -> Result<(), StoreError>;
    fn add(&mut self, peer: PeerRecord) -> Result<SectionId, StoreError>;
    fn remove(&mut self, id: &SectionId) -> Result<PeerRecord, StoreError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MemoryStore {
    sections: Vec<(SectionId, PeerRecord)>,
}

impl MemoryStore {
    pub fn iter(&self) -> impl Iterator<Item = (&SectionId, &PeerRecord)> {
        self.sections.iter().map(|(id, peer)| (id, peer))
    }

    fn position(&self, id: &SectionId) -> Result<usize, StoreError> {
        self.sections
            .iter()
            .position(|(sid, _)| sid == id)
            .ok_or_else(|| StoreError::UnknownSection(id.clone()))
    }
}

impl SectionStore for MemoryStore {
    fn sections(&self) -> Vec<SectionId> {
        self.sections.iter().map(|(id, _)| id.clone()).collect()
    }

    fn get(&self, id: &SectionId) -> Option<&PeerRecord> {
        self.sections
            .iter()
            .find(|(sid, _)| sid == id)
            .map(|(_, peer)| peer)
    }

    fn set(&mut self, id: &SectionId, peer: PeerRecord) -> Result<(), StoreError> {
        let idx = self.position(id)?;
        self.sections[idx].1 = peer;
        Ok(())
    }

    fn add(&mut self, peer: PeerRecord) -> Result<SectionId, StoreError> {
        let id = SectionId::generate();
        self.sections.push((id.clone(), peer));
        Ok(id)
    }

    fn remove(&mut self, id: &SectionId) -> Result<PeerRecord, StoreError> {
        let idx = self.position(id)?;
        Ok(self.sections.remove(idx).1)
    }
}

/// Interface form state and its peers, as kept on disk between runs.
#[derive(Debug, Default, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Snapshot {
    pub interface: InterfaceRecord,
    pub peers: MemoryStore,
}

impl Snapshot {
    /// A missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("no state at {}, starting empty", path.display());
                return Ok(Snapshot::default());
            }
            Err(err) => return Err(err.into()),
        };

        let (snapshot, _) = bincode::decode_from_slice(&data, BINCODE_CONFIG)?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let data = bincode::encode_to_vec(self, BINCODE_CONFIG)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::awg::{Key, instance::ObfsParam};

    use super::*;

    fn peer(key: &str) -> PeerRecord {
        PeerRecord {
            public_key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_store_add_get_remove() {
        let mut store = MemoryStore::default();
        let a = store.add(peer("a")).unwrap();
        let b = store.add(peer("b")).unwrap();

        assert_ne!(a, b);
        assert!(a.to_string().starts_with("cfg"));
        assert_eq!(store.sections(), vec![a.clone(), b.clone()]);
        assert_eq!(store.get(&b).map(|p| p.public_key.as_str()), Some("b"));

        store.set(&a, peer("c")).unwrap();
        assert_eq!(store.get(&a).map(|p| p.public_key.as_str()), Some("c"));

        assert_eq!(store.remove(&a).unwrap().public_key, "c");
        assert!(store.get(&a).is_none());
        assert!(matches!(
            store.remove(&a),
            Err(StoreError::UnknownSection(_))
        ));
        assert_eq!(store.sections(), vec![b]);
    }

    #[test]
    fn test_snapshot_encoding() {
        let mut snapshot = Snapshot::default();
        snapshot.interface.private_key = Key::random().to_string();
        snapshot.interface.obfs.set(ObfsParam::Jc, "4");
        snapshot.interface.obfs.set(ObfsParam::I3, "<r 10>");
        snapshot.peers.add(peer("a")).unwrap();

        let data = bincode::encode_to_vec(&snapshot, BINCODE_CONFIG).unwrap();
        let (decoded, _): (Snapshot, usize) =
            bincode::decode_from_slice(&data, BINCODE_CONFIG).unwrap();

        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_snapshot_missing_file() {
        let path = std::env::temp_dir().join(format!("{}.bin", SectionId::generate()));

        assert_eq!(Snapshot::load(&path).unwrap(), Snapshot::default());
    }
}
