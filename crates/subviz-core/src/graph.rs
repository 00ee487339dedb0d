use std::collections::HashSet;

use tracing::{debug, info};

use crate::account::AccountStateResolver;
use crate::amount::UnitScale;
use crate::error::CoreError;
use crate::labels::AddressBook;
use crate::types::{
    AddressNode, BlockHeight, EdgeKind, GraphStats, TransactionRecord, TransferEdge,
    TransferGraph, FINALITY_DEPTH,
};

// ==============================================================================
// Transfer Graph Builder
// ==============================================================================

/// Builds an address graph from an ordered stream of transfer records.
///
/// Records are scanned one at a time, in the order given. Each address gets
/// one node, created the first time it appears as sender or recipient, with
/// the balance resolved at the chain tip at that moment. Every record adds
/// one edge; parallel edges are kept.
///
/// The scan is sequential so node order is the first-seen order and no
/// address is resolved twice.
pub struct GraphBuilder<'a> {
    resolver: &'a AccountStateResolver,
    labels: &'a AddressBook,
    scale: UnitScale,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(resolver: &'a AccountStateResolver, labels: &'a AddressBook, scale: UnitScale) -> Self {
        Self {
            resolver,
            labels,
            scale,
        }
    }

    pub async fn build<I>(&self, records: I) -> Result<TransferGraph, CoreError>
    where
        I: IntoIterator<Item = TransactionRecord>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut nodes: Vec<AddressNode> = Vec::new();
        let mut edges: Vec<TransferEdge> = Vec::new();
        let mut records_scanned = 0usize;

        for record in records {
            debug!(height = %record.height, "processing transfer");
            records_scanned += 1;

            for address in [&record.sender_id, &record.recipient_id] {
                if !seen.insert(address.clone()) {
                    continue;
                }
                nodes.push(self.resolve_node(address).await?);
            }

            edges.push(self.edge_for(&record));
        }

        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            records = records_scanned,
            "transfer graph built"
        );

        Ok(TransferGraph {
            stats: GraphStats {
                node_count: nodes.len(),
                edge_count: edges.len(),
                records_scanned,
            },
            nodes,
            edges,
        })
    }

    async fn resolve_node(&self, address: &str) -> Result<AddressNode, CoreError> {
        let balance = self.resolver.fetch_current_balance(address).await?;
        let label = self.labels.label_for(address);
        if label != address {
            debug!(address, label = %label, "labelled address");
        }
        Ok(AddressNode {
            id: address.to_owned(),
            label,
            balance: self.scale.to_decimal(balance.total()),
        })
    }

    fn edge_for(&self, record: &TransactionRecord) -> TransferEdge {
        TransferEdge {
            source: record.sender_id.clone(),
            target: record.recipient_id.clone(),
            kind: EdgeKind::Directed,
            weight: self.scale.to_decimal(record.amount),
            block: record.height,
            finalized_estimate: BlockHeight(record.height.0 + FINALITY_DEPTH),
        }
    }
}

// ==============================================================================
// Tests
// ==============================================================================
