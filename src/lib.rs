//! Lazy traversal of node relationship chains in a fixed-record graph store.
//!
//! A node keeps its relationships either in one linked chain threaded through
//! the relationship records ("sparse"), or in a list of per-type relationship
//! groups, each holding outgoing, incoming and loop sub-chains ("dense").
//! [`traversal::RelationshipChains`] hides that difference behind a single
//! filtered iterator that reads one record per step.

#![warn(missing_docs)]

pub mod admin;
pub mod cli;
pub mod primitives;
pub mod storage;
pub mod traversal;
pub mod types;
