//! Graph export sinks.
//!
//! [`CsvExport`] writes the node and edge tables in the layout Gephi's
//! spreadsheet importer expects.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::CoreError;
use crate::types::{AddressNode, TransferEdge};

/// Destination for a finished graph. `name` identifies the export, e.g.
/// the chain it was built for; it may be empty.
pub trait ExportSink {
    fn export(
        &self,
        name: &str,
        nodes: &[AddressNode],
        edges: &[TransferEdge],
    ) -> Result<(), CoreError>;
}

const NODE_HEADERS: [&str; 3] = ["id", "Label", "Balance"];
const EDGE_HEADERS: [&str; 6] = ["Source", "Target", "Type", "Weight", "Block", "Finalized"];

#[derive(Serialize)]
struct NodeRow<'a> {
    id: &'a str,
    label: &'a str,
    balance: f64,
}

#[derive(Serialize)]
struct EdgeRow<'a> {
    source: &'a str,
    target: &'a str,
    kind: String,
    weight: f64,
    block: u64,
    finalized: u64,
}

/// Writer with an explicit header row, so empty tables still carry one.
fn table_writer(path: &Path, headers: &[&str]) -> Result<csv::Writer<std::fs::File>, CoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(headers)?;
    Ok(writer)
}

/// Writes `<name>nodes.csv` and `<name>edges.csv` into a directory,
/// creating it when missing.
#[derive(Debug, Clone)]
pub struct CsvExport {
    dir: PathBuf,
}

impl CsvExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn nodes_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}nodes.csv"))
    }

    pub fn edges_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}edges.csv"))
    }

    fn write_nodes(path: &Path, nodes: &[AddressNode]) -> Result<(), CoreError> {
        let mut writer = table_writer(path, &NODE_HEADERS)?;
        for node in nodes {
            writer.serialize(NodeRow {
                id: &node.id,
                label: &node.label,
                balance: node.balance,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_edges(path: &Path, edges: &[TransferEdge]) -> Result<(), CoreError> {
        let mut writer = table_writer(path, &EDGE_HEADERS)?;
        for edge in edges {
            writer.serialize(EdgeRow {
                source: &edge.source,
                target: &edge.target,
                kind: edge.kind.to_string(),
                weight: edge.weight,
                block: edge.block.0,
                finalized: edge.finalized_estimate.0,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ExportSink for CsvExport {
    fn export(
        &self,
        name: &str,
        nodes: &[AddressNode],
        edges: &[TransferEdge],
    ) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.dir)?;

        let nodes_path = self.nodes_path(name);
        let edges_path = self.edges_path(name);
        Self::write_nodes(&nodes_path, nodes)?;
        Self::write_edges(&edges_path, edges)?;

        info!(
            nodes = %nodes_path.display(),
            edges = %edges_path.display(),
            node_count = nodes.len(),
            edge_count = edges.len(),
            "graph exported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::types::{BlockHeight, EdgeKind};

    fn temp_dir(tag: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time must be after unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("subviz-export-{tag}-{unique}"))
            .join("nested")
    }

    fn sample() -> (Vec<AddressNode>, Vec<TransferEdge>) {
        let nodes = vec![
            AddressNode {
                id: "A".into(),
                label: "Exchange".into(),
                balance: 2.0,
            },
            AddressNode {
                id: "B".into(),
                label: "B".into(),
                balance: 0.5,
            },
        ];
        let edges = vec![TransferEdge {
            source: "A".into(),
            target: "B".into(),
            kind: EdgeKind::Directed,
            weight: 5.0,
            block: BlockHeight(100),
            finalized_estimate: BlockHeight(106),
        }];
        (nodes, edges)
    }

    #[test]
    fn writes_node_and_edge_tables() {
        let dir = temp_dir("tables");
        let sink = CsvExport::new(&dir);
        let (nodes, edges) = sample();

        sink.export("Kusama", &nodes, &edges).expect("export");

        let node_csv = std::fs::read_to_string(sink.nodes_path("Kusama")).expect("nodes file");
        let mut lines = node_csv.lines();
        assert_eq!(lines.next(), Some("id,Label,Balance"));
        assert_eq!(lines.next(), Some("A,Exchange,2.0"));
        assert_eq!(lines.next(), Some("B,B,0.5"));
        assert_eq!(lines.next(), None);

        let edge_csv = std::fs::read_to_string(sink.edges_path("Kusama")).expect("edges file");
        let mut lines = edge_csv.lines();
        assert_eq!(lines.next(), Some("Source,Target,Type,Weight,Block,Finalized"));
        assert_eq!(lines.next(), Some("A,B,directed,5.0,100,106"));
        assert_eq!(lines.next(), None);

        let _ = std::fs::remove_dir_all(dir.parent().unwrap_or(&dir));
    }

    #[test]
    fn file_names_are_prefixed_with_export_name() {
        let sink = CsvExport::new("/tmp/out");
        assert_eq!(sink.nodes_path("Polkadot"), PathBuf::from("/tmp/out/Polkadotnodes.csv"));
        assert_eq!(sink.edges_path("Polkadot"), PathBuf::from("/tmp/out/Polkadotedges.csv"));
    }

    #[test]
    fn empty_export_name_gives_plain_file_names() {
        let sink = CsvExport::new("/tmp/out");
        assert_eq!(sink.nodes_path(""), PathBuf::from("/tmp/out/nodes.csv"));
        assert_eq!(sink.edges_path(""), PathBuf::from("/tmp/out/edges.csv"));
    }

    #[test]
    fn empty_graph_writes_only_headers() {
        let dir = temp_dir("empty");
        let sink = CsvExport::new(&dir);
        sink.export("x", &[], &[]).expect("export");

        let node_csv = std::fs::read_to_string(sink.nodes_path("x")).expect("nodes file");
        assert_eq!(node_csv, "id,Label,Balance\n");
        let edge_csv = std::fs::read_to_string(sink.edges_path("x")).expect("edges file");
        assert_eq!(edge_csv, "Source,Target,Type,Weight,Block,Finalized\n");

        let _ = std::fs::remove_dir_all(dir.parent().unwrap_or(&dir));
    }
}
