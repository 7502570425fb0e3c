//! File-backed fixed-record store.
//!
//! A store is a directory holding one file per record kind. Each file starts
//! with a [`FILE_HDR_LEN`]-byte header followed by equally sized slots, so
//! record `id` lives at `FILE_HDR_LEN + id * record_size`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::primitives::io::{FileIo, StdFileIo};
use crate::types::{GroupId, NodeId, RecordKind, RelId, RelchainError, Result};

use super::record::{
    decode_group, decode_node, decode_relationship, encode_group, encode_node,
    encode_relationship, NodeRecord, RelationshipGroupRecord, RelationshipRecord,
    GROUP_RECORD_SIZE, NODE_RECORD_SIZE, REL_RECORD_SIZE,
};
use super::store::{MemStore, RecordStore};

/// Magic bytes at the start of every store file.
pub const FILE_MAGIC: [u8; 4] = *b"RLCH";
/// Store file format version.
pub const FILE_FORMAT_VERSION: u16 = 1;
/// Length of the per-file header.
pub const FILE_HDR_LEN: usize = 16;

/// File name of the node records.
pub const NODES_FILE: &str = "nodes.store";
/// File name of the relationship records.
pub const RELATIONSHIPS_FILE: &str = "relationships.store";
/// File name of the relationship-group records.
pub const GROUPS_FILE: &str = "groups.store";

mod header {
    //! Byte offsets for fixed header fields.
    use core::ops::Range;

    pub const MAGIC: Range<usize> = 0..4;
    pub const FORMAT_VERSION: Range<usize> = 4..6;
    pub const KIND: usize = 6;
    pub const RESERVED: usize = 7;
    pub const RECORD_SIZE: Range<usize> = 8..12;
}

fn record_size(kind: RecordKind) -> usize {
    match kind {
        RecordKind::Node => NODE_RECORD_SIZE,
        RecordKind::Relationship => REL_RECORD_SIZE,
        RecordKind::Group => GROUP_RECORD_SIZE,
    }
}

fn encode_header(kind: RecordKind) -> [u8; FILE_HDR_LEN] {
    let mut hdr = [0u8; FILE_HDR_LEN];
    hdr[header::MAGIC].copy_from_slice(&FILE_MAGIC);
    hdr[header::FORMAT_VERSION].copy_from_slice(&FILE_FORMAT_VERSION.to_be_bytes());
    hdr[header::KIND] = kind.tag();
    hdr[header::RECORD_SIZE].copy_from_slice(&(record_size(kind) as u32).to_be_bytes());
    hdr
}

fn check_header(kind: RecordKind, hdr: &[u8; FILE_HDR_LEN]) -> Result<()> {
    if hdr[header::MAGIC] != FILE_MAGIC {
        return Err(RelchainError::Corruption("invalid store file magic"));
    }
    let mut version = [0u8; 2];
    version.copy_from_slice(&hdr[header::FORMAT_VERSION]);
    if u16::from_be_bytes(version) != FILE_FORMAT_VERSION {
        return Err(RelchainError::Corruption("unsupported store format version"));
    }
    if hdr[header::KIND] != kind.tag() {
        return Err(RelchainError::Corruption("store file holds another record kind"));
    }
    if hdr[header::RESERVED] != 0 {
        return Err(RelchainError::Corruption("store header reserved byte not zero"));
    }
    let mut size = [0u8; 4];
    size.copy_from_slice(&hdr[header::RECORD_SIZE]);
    if u32::from_be_bytes(size) as usize != record_size(kind) {
        return Err(RelchainError::Corruption("store record size mismatch"));
    }
    Ok(())
}

/// One record file: header-validated, read by slot.
struct RecordFile {
    io: StdFileIo,
    kind: RecordKind,
    high_id: u64,
}

impl RecordFile {
    fn open(path: &Path, kind: RecordKind) -> Result<Self> {
        let io = StdFileIo::open_read(path)?;
        let len = io.len()?;
        if len < FILE_HDR_LEN as u64 {
            return Err(RelchainError::Corruption("store file header truncated"));
        }
        let mut hdr = [0u8; FILE_HDR_LEN];
        io.read_at(0, &mut hdr)?;
        check_header(kind, &hdr)?;
        let high_id = (len - FILE_HDR_LEN as u64) / record_size(kind) as u64;
        debug!(kind = %kind, path = %path.display(), high_id, "store.file.open");
        Ok(Self { io, kind, high_id })
    }

    fn write<'a>(
        path: &Path,
        kind: RecordKind,
        slots: impl Iterator<Item = Option<&'a [u8]>>,
    ) -> Result<u64> {
        let io = StdFileIo::create(path)?;
        io.write_at(0, &encode_header(kind))?;
        let size = record_size(kind);
        let empty = vec![0u8; size];
        let mut count = 0u64;
        for slot in slots {
            let off = FILE_HDR_LEN as u64 + count * size as u64;
            io.write_at(off, slot.unwrap_or(&empty))?;
            count += 1;
        }
        io.sync_all()?;
        Ok(count)
    }

    /// Reads slot `id`; `None` when past the end of the file.
    fn read_slot<'b>(&self, id: u64, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>> {
        if id >= self.high_id {
            return Ok(None);
        }
        let size = record_size(self.kind);
        let off = FILE_HDR_LEN as u64 + id * size as u64;
        let slot = &mut buf[..size];
        self.io.read_at(off, slot)?;
        Ok(Some(slot))
    }
}

/// Read-only store over a directory of record files.
pub struct FileStore {
    dir: PathBuf,
    nodes: RecordFile,
    relationships: RecordFile,
    groups: RecordFile,
}

impl FileStore {
    /// Opens the store in `dir`, validating every file header.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let store = Self {
            nodes: RecordFile::open(&dir.join(NODES_FILE), RecordKind::Node)?,
            relationships: RecordFile::open(
                &dir.join(RELATIONSHIPS_FILE),
                RecordKind::Relationship,
            )?,
            groups: RecordFile::open(&dir.join(GROUPS_FILE), RecordKind::Group)?,
            dir,
        };
        info!(
            dir = %store.dir.display(),
            nodes = store.nodes.high_id,
            relationships = store.relationships.high_id,
            groups = store.groups.high_id,
            "store.open"
        );
        Ok(store)
    }

    /// Writes every slot of `source` into a new store in `dir`, replacing any
    /// existing store files there.
    pub fn create(dir: impl AsRef<Path>, source: &MemStore) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let nodes: Vec<Option<[u8; NODE_RECORD_SIZE]>> = source
            .node_slots()
            .iter()
            .map(|slot| slot.as_ref().map(encode_node))
            .collect();
        let relationships: Vec<Option<[u8; REL_RECORD_SIZE]>> = source
            .relationship_slots()
            .iter()
            .map(|slot| slot.as_ref().map(encode_relationship))
            .collect();
        let groups: Vec<Option<[u8; GROUP_RECORD_SIZE]>> = source
            .group_slots()
            .iter()
            .map(|slot| slot.as_ref().map(encode_group))
            .collect();
        RecordFile::write(
            &dir.join(NODES_FILE),
            RecordKind::Node,
            nodes.iter().map(|s| s.as_ref().map(|b| &b[..])),
        )?;
        RecordFile::write(
            &dir.join(RELATIONSHIPS_FILE),
            RecordKind::Relationship,
            relationships.iter().map(|s| s.as_ref().map(|b| &b[..])),
        )?;
        RecordFile::write(
            &dir.join(GROUPS_FILE),
            RecordKind::Group,
            groups.iter().map(|s| s.as_ref().map(|b| &b[..])),
        )?;
        info!(dir = %dir.display(), "store.create");
        Self::open(dir)
    }

    /// Directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of relationship slots.
    pub fn relationship_high_id(&self) -> u64 {
        self.relationships.high_id
    }

    /// Number of group slots.
    pub fn group_high_id(&self) -> u64 {
        self.groups.high_id
    }
}

impl RecordStore for FileStore {
    fn load_node(&self, id: NodeId) -> Result<Option<NodeRecord>> {
        let mut buf = [0u8; NODE_RECORD_SIZE];
        match self.nodes.read_slot(id.0, &mut buf)? {
            Some(slot) => decode_node(id, slot),
            None => Ok(None),
        }
    }

    fn load_relationship(&self, id: RelId) -> Result<RelationshipRecord> {
        let mut buf = [0u8; REL_RECORD_SIZE];
        let record = match self.relationships.read_slot(id.0, &mut buf)? {
            Some(slot) => decode_relationship(id, slot)?,
            None => None,
        };
        record.ok_or(RelchainError::RecordNotInUse {
            kind: RecordKind::Relationship,
            id: id.0,
        })
    }

    fn load_group(&self, id: GroupId) -> Result<Option<RelationshipGroupRecord>> {
        let mut buf = [0u8; GROUP_RECORD_SIZE];
        match self.groups.read_slot(id.0, &mut buf)? {
            Some(slot) => decode_group(id, slot),
            None => Ok(None),
        }
    }

    fn node_high_id(&self) -> u64 {
        self.nodes.high_id
    }
}
