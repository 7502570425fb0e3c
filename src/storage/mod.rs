//! Fixed-record graph store.
//!
//! Provides the record layouts, the [`RecordStore`] lookup trait consumed by
//! relationship traversal, an in-memory and a file-backed implementation, and
//! a builder that lays out chains and groups for a batch of relationships.

mod builder;
mod file;
mod record;
mod store;

/// Layout builder for well-formed stores.
pub use builder::{BuildOptions, StoreBuilder, DEFAULT_DENSE_THRESHOLD};

/// File-backed store.
pub use file::{
    FileStore, FILE_FORMAT_VERSION, FILE_HDR_LEN, FILE_MAGIC, GROUPS_FILE, NODES_FILE,
    RELATIONSHIPS_FILE,
};

/// Record layouts and codecs.
pub use record::{
    decode_group, decode_node, decode_relationship, encode_group, encode_node,
    encode_relationship, NodeAnchor, NodeRecord, RelationshipGroupRecord, RelationshipRecord,
    GROUP_RECORD_SIZE, NODE_RECORD_SIZE, REL_RECORD_SIZE,
};

/// Record lookup trait and the in-memory store.
pub use store::{MemStore, RecordStore};
