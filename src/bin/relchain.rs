//! Binary entry point for the relchain CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use relchain::{
    admin::{verify_store, VerifyReport},
    cli::{
        config::CliConfig,
        import::{run_import, ImportConfig, ImportSummary},
        init_logging, CliError,
    },
    storage::{FileStore, RelationshipRecord},
    traversal::{AnyType, Direction, RelationshipChains, TraversalOptions, TypeFilter, TypeSet},
    types::{NodeId, Result as StoreResult, TypeId},
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "relchain",
    version,
    about = "Build and inspect fixed-record relationship chain stores",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "RELCHAIN_CONFIG",
        value_name = "FILE",
        help = "Path to the CLI config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Log filter (overrides the config file; RUST_LOG wins over both)"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Build a store from a CSV edge list (first,second,type)")]
    Import(ImportCmd),

    #[command(about = "List a node's relationships")]
    Rels(RelsCmd),

    #[command(about = "Traverse every node and report broken chains")]
    Verify {
        #[arg(value_name = "DIR", help = "Store directory (defaults to [store] default)")]
        dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ImportCmd {
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    #[arg(long, value_name = "FILE", help = "CSV file containing relationships")]
    edges: PathBuf,

    #[arg(long, value_name = "N", help = "Number of nodes to allocate")]
    nodes: Option<u64>,

    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Degree at which a node is stored with relationship groups"
    )]
    dense_threshold: Option<u64>,
}

#[derive(Args, Debug)]
struct RelsCmd {
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    #[arg(value_name = "NODE")]
    node: u64,

    #[arg(long = "type", value_name = "ID", help = "Only this relationship type (repeatable)")]
    types: Vec<u32>,

    #[arg(long, value_enum, default_value_t = DirectionArg::Both)]
    direction: DirectionArg,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DirectionArg {
    Out,
    In,
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Out => Direction::Outgoing,
            DirectionArg::In => Direction::Incoming,
            DirectionArg::Both => Direction::Both,
        }
    }
}

#[derive(Debug, Serialize)]
struct RelRow {
    id: u64,
    first: u64,
    second: u64,
    #[serde(rename = "type")]
    ty: u32,
}

impl From<&RelationshipRecord> for RelRow {
    fn from(record: &RelationshipRecord) -> Self {
        Self {
            id: record.id.0,
            first: record.first.0,
            second: record.second.0,
            ty: record.ty.0,
        }
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found problems.
fn run() -> Result<bool, Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.clone()).map_err(CliError::from)?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level().to_string());
    init_logging(&level)?;

    match cli.command {
        Command::Import(cmd) => {
            let mut build = config.build_options();
            if let Some(threshold) = cmd.dense_threshold {
                let threshold = usize::try_from(threshold).map_err(|_| {
                    CliError::Message(format!(
                        "dense threshold {threshold} does not fit this platform"
                    ))
                })?;
                build = build.dense_threshold(threshold);
            }
            let import_cfg = ImportConfig {
                edges: cmd.edges,
                out: cmd.dir,
                nodes: cmd.nodes,
                build,
            };
            let summary = run_import(&import_cfg)?;
            emit(&cli.format, &summary, || print_import_text(&summary))?;
        }
        Command::Rels(cmd) => {
            let store = FileStore::open(&cmd.dir)?;
            let node = NodeId(cmd.node);
            let direction = cmd.direction.into();
            let opts = config.traversal_options();
            let rows = if cmd.types.is_empty() {
                collect_rows(&store, node, AnyType, direction, opts)?
            } else {
                let types = TypeSet::new(cmd.types.iter().copied().map(TypeId));
                collect_rows(&store, node, types, direction, opts)?
            };
            emit(&cli.format, &rows, || print_rels_text(&rows))?;
        }
        Command::Verify { dir } => {
            let dir = dir
                .or_else(|| config.default_store().cloned())
                .ok_or_else(|| CliError::from("no store directory given and no [store] default"))?;
            let store = FileStore::open(&dir)?;
            let report = verify_store(&store)?;
            emit(&cli.format, &report, || print_verify_text(&report))?;
            return Ok(report.success);
        }
    }
    Ok(true)
}

fn collect_rows<F: TypeFilter>(
    store: &FileStore,
    node: NodeId,
    filter: F,
    direction: Direction,
    opts: TraversalOptions,
) -> StoreResult<Vec<RelRow>> {
    let chains = RelationshipChains::open_with(store, node, filter, direction, opts)?;
    let mut iter = chains.iter()?;
    let mut rows = Vec::new();
    while let Some(id) = iter.next() {
        id?;
        if let Some(record) = iter.record() {
            rows.push(RelRow::from(record));
        }
    }
    Ok(rows)
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_import_text(summary: &ImportSummary) {
    println!(
        "Imported {} nodes and {} relationships ({} dense)",
        summary.nodes, summary.relationships, summary.dense_nodes
    );
}

fn print_rels_text(rows: &[RelRow]) {
    for row in rows {
        println!("{} {} {} {}", row.id, row.first, row.second, row.ty);
    }
}

fn print_verify_text(report: &VerifyReport) {
    println!(
        "Verify => success={} nodes_checked={} relationships_seen={} failed_nodes={}",
        report.success, report.nodes_checked, report.relationships_seen, report.failed_nodes
    );
    for finding in &report.findings {
        println!("- Node[{}]: {}", finding.node, finding.message);
    }
}
