#![forbid(unsafe_code)]

//! Store maintenance utilities.

mod verify;

/// Store integrity verification.
///
/// Traverses every node's relationships and reports the nodes whose chains
/// are broken.
pub use verify::{verify_store, VerifyFinding, VerifyReport};
