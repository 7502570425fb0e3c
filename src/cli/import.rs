use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::info;

use crate::storage::{BuildOptions, FileStore, StoreBuilder};
use crate::types::{NodeId, TypeId};

use super::CliError;

const FIRST_COLUMN: &str = "first";
const SECOND_COLUMN: &str = "second";
const TYPE_COLUMN: &str = "type";

/// Largest node count an import will allocate; node ids are dense slots.
pub const MAX_IMPORT_NODES: u64 = 1 << 28;

/// Configuration for importing an edge list into a new store.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// CSV file with a `first,second,type` header.
    pub edges: PathBuf,
    /// Directory the store files are written to.
    pub out: PathBuf,
    /// Number of nodes to allocate. Defaults to the largest endpoint plus one.
    pub nodes: Option<u64>,
    /// Layout options for the builder.
    pub build: BuildOptions,
}

/// Summary statistics from an import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Nodes allocated in the store.
    pub nodes: u64,
    /// Relationships written.
    pub relationships: u64,
    /// Nodes laid out with relationship groups.
    pub dense_nodes: u64,
}

struct EdgeRow {
    first: u64,
    second: u64,
    ty: u32,
}

/// Reads the edge list, lays out chains and writes the store.
pub fn run_import(cfg: &ImportConfig) -> Result<ImportSummary, CliError> {
    let rows = read_edges(cfg)?;
    let highest = rows.iter().map(|row| row.first.max(row.second)).max();
    let required = match highest {
        Some(id) => id.checked_add(1).ok_or_else(|| {
            CliError::Message(format!("node id {id} is outside the supported range"))
        })?,
        None => 0,
    };
    let nodes = match cfg.nodes {
        Some(count) if count < required => {
            return Err(CliError::Message(format!(
                "edge list references node {} but only {count} nodes were requested",
                required - 1
            )))
        }
        Some(count) => count,
        None => required,
    };
    if nodes > MAX_IMPORT_NODES {
        return Err(CliError::Message(format!(
            "import needs {nodes} nodes, more than the limit of {MAX_IMPORT_NODES}"
        )));
    }

    let mut builder = StoreBuilder::new(cfg.build);
    builder.add_nodes(nodes);
    for row in &rows {
        builder.add_relationship(NodeId(row.first), NodeId(row.second), TypeId(row.ty))?;
    }
    let store = builder.build();
    let dense_nodes = store
        .node_slots()
        .iter()
        .flatten()
        .filter(|node| node.dense)
        .count() as u64;
    FileStore::create(&cfg.out, &store)?;

    let summary = ImportSummary {
        nodes,
        relationships: rows.len() as u64,
        dense_nodes,
    };
    info!(
        out = %cfg.out.display(),
        nodes = summary.nodes,
        relationships = summary.relationships,
        dense = summary.dense_nodes,
        "import.complete"
    );
    Ok(summary)
}

fn read_edges(cfg: &ImportConfig) -> Result<Vec<EdgeRow>, CliError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(&cfg.edges)?;
    let headers = reader.headers()?.clone();
    let first_index = find_column(&headers, FIRST_COLUMN)?;
    let second_index = find_column(&headers, SECOND_COLUMN)?;
    let ty_index = find_column(&headers, TYPE_COLUMN)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |pos| pos.line());
        rows.push(EdgeRow {
            first: parse_field(&record, first_index, FIRST_COLUMN, line)?,
            second: parse_field(&record, second_index, SECOND_COLUMN, line)?,
            ty: parse_field(&record, ty_index, TYPE_COLUMN, line)?,
        });
    }
    Ok(rows)
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, CliError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::Message(format!("column '{}' not found", name)))
}

fn parse_field<T: std::str::FromStr>(
    record: &StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<T, CliError> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Message(format!("line {line}: missing value for '{name}'")))?;
    raw.parse()
        .map_err(|_| CliError::Message(format!("line {line}: invalid {name} '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RecordStore;
    use std::fs;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path, csv: &str) -> ImportConfig {
        let edges = dir.join("edges.csv");
        fs::write(&edges, csv).unwrap();
        ImportConfig {
            edges,
            out: dir.join("store"),
            nodes: None,
            build: BuildOptions::default(),
        }
    }

    #[test]
    fn imports_edge_list() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), "first,second,type\n0,1,7\n1, 2 ,7\n2,2,3\n");
        cfg.build = BuildOptions::default().dense_threshold(3);
        let summary = run_import(&cfg).unwrap();
        assert_eq!(summary.nodes, 3);
        assert_eq!(summary.relationships, 3);
        // node 2 has one plain relationship and one loop: below the threshold
        assert_eq!(summary.dense_nodes, 0);

        let store = FileStore::open(&cfg.out).unwrap();
        assert_eq!(store.node_high_id(), 3);
        assert_eq!(store.relationship_high_id(), 3);
    }

    #[test]
    fn explicit_node_count_allocates_isolated_nodes() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), "first,second,type\n0,1,1\n");
        cfg.nodes = Some(5);
        let summary = run_import(&cfg).unwrap();
        assert_eq!(summary.nodes, 5);

        cfg.nodes = Some(1);
        let err = run_import(&cfg).unwrap_err();
        assert!(err.to_string().contains("references node 1"));
    }

    #[test]
    fn reports_bad_rows() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), "first,second,type\n0,x,1\n");
        let err = run_import(&cfg).unwrap_err();
        assert!(err.to_string().contains("invalid second 'x'"), "{err}");

        let cfg = config(dir.path(), "src,dst,type\n0,1,1\n");
        let err = run_import(&cfg).unwrap_err();
        assert!(err.to_string().contains("column 'first' not found"));
    }

    #[test]
    fn rejects_node_ids_beyond_the_limit() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), "first,second,type\n18446744073709551615,0,1\n");
        let err = run_import(&cfg).unwrap_err();
        assert!(err.to_string().contains("outside the supported range"), "{err}");

        let cfg = config(dir.path(), "first,second,type\n0,1000000000000,1\n");
        let err = run_import(&cfg).unwrap_err();
        assert!(err.to_string().contains("more than the limit"), "{err}");

        let mut cfg = config(dir.path(), "first,second,type\n0,1,1\n");
        cfg.nodes = Some(MAX_IMPORT_NODES + 1);
        let err = run_import(&cfg).unwrap_err();
        assert!(err.to_string().contains("more than the limit"), "{err}");
        assert!(!cfg.out.exists());
    }
}
