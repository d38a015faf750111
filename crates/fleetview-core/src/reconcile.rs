// ── Row reconciliation ──
//
// Turns the currently rendered rows into the desired ordered view with the
// fewest structural changes. A row that stays in the view keeps its handle
// and its visibility subscription across any number of passes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::detail::{RowObserver, SubscriptionId};
use crate::model::{MetricChannel, MetricsTable, Node, NodeId};

/// Identity of a rendered row. Never reused within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(u64);

/// Display text of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContent {
    pub region: String,
    pub provider: String,
    pub hostname: String,
    pub ip: String,
    pub country_code: String,
    /// Rendered texts for cpu, io, nic, network and congestion.
    pub metrics: [String; 5],
}

impl RowContent {
    pub fn of(node: &Node, metrics: &MetricsTable) -> Self {
        let snapshot = metrics.get(node.id());
        let text = |channel: MetricChannel| {
            snapshot.map_or_else(
                || crate::model::PLACEHOLDER.to_owned(),
                |s| s.get(channel).rendered(channel),
            )
        };
        let provider = if node.provider_brand().is_empty() {
            node.provider()
        } else {
            node.provider_brand()
        };
        Self {
            region: node.region().to_owned(),
            provider: provider.to_owned(),
            hostname: node.hostname().to_owned(),
            ip: node.ipv4().to_owned(),
            country_code: node.country_code().to_owned(),
            metrics: [
                text(MetricChannel::CpuLoad),
                text(MetricChannel::IoWait),
                text(MetricChannel::NicError),
                text(MetricChannel::Network),
                text(MetricChannel::Congestion),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    handle: RowHandle,
    node_id: NodeId,
    subscription: SubscriptionId,
    content: RowContent,
}

impl RenderedRow {
    pub fn handle(&self) -> RowHandle {
        self.handle
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    pub fn content(&self) -> &RowContent {
        &self.content
    }
}

/// One structural or content change applied to the rendered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// All rows (and any placeholder) dropped.
    Clear,
    /// The body shows a single message row instead of nodes.
    Placeholder { message: String },
    Insert { id: NodeId, at: usize },
    Move { id: NodeId, from: usize, to: usize },
    /// Row text changed in place.
    Update { id: NodeId },
    Remove { id: NodeId },
}

/// The rendered row set.
#[derive(Debug, Default)]
pub struct RenderedTable {
    rows: Vec<RenderedRow>,
    placeholder: Option<String>,
    next_handle: u64,
}

impl RenderedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn row(&self, id: &NodeId) -> Option<&RenderedRow> {
        self.rows.iter().find(|r| &r.node_id == id)
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.rows.iter().map(|r| r.node_id.clone()).collect()
    }

    /// Show a single message row (loading, load failure, no matches).
    pub fn show_placeholder(&mut self, message: &str, observer: &dyn RowObserver) -> Vec<Patch> {
        if self.rows.is_empty() && self.placeholder.as_deref() == Some(message) {
            return Vec::new();
        }
        observer.unobserve_all();
        self.rows.clear();
        self.placeholder = Some(message.to_owned());
        vec![
            Patch::Clear,
            Patch::Placeholder {
                message: message.to_owned(),
            },
        ]
    }

    /// Bring the rendered rows in line with `desired`.
    ///
    /// An empty `desired` renders `empty_message` as a placeholder. With no
    /// rows currently rendered the table is rebuilt from scratch; otherwise
    /// rows are removed, inserted, moved and updated in a single pass.
    pub fn reconcile(
        &mut self,
        desired: &[Arc<Node>],
        metrics: &MetricsTable,
        empty_message: &str,
        observer: &dyn RowObserver,
    ) -> Vec<Patch> {
        if desired.is_empty() {
            return self.show_placeholder(empty_message, observer);
        }
        if self.rows.is_empty() {
            return self.rebuild(desired, metrics, observer);
        }

        let mut patches = Vec::new();
        let desired_index: HashMap<&NodeId, usize> =
            desired.iter().enumerate().map(|(i, n)| (n.id(), i)).collect();

        self.rows.retain(|row| {
            if desired_index.contains_key(&row.node_id) {
                true
            } else {
                observer.unobserve(row.subscription);
                patches.push(Patch::Remove {
                    id: row.node_id.clone(),
                });
                false
            }
        });

        for (pos, node) in desired.iter().enumerate() {
            let content = RowContent::of(node, metrics);
            // Rows before `pos` are already in their final place.
            let found = self.rows[pos..]
                .iter()
                .position(|r| &r.node_id == node.id())
                .map(|offset| pos + offset);

            match found {
                None => {
                    let row = self.new_row(node, content, observer);
                    self.rows.insert(pos, row);
                    patches.push(Patch::Insert {
                        id: node.id().clone(),
                        at: pos,
                    });
                }
                Some(from) => {
                    if from != pos {
                        let row = self.rows.remove(from);
                        self.rows.insert(pos, row);
                        patches.push(Patch::Move {
                            id: node.id().clone(),
                            from,
                            to: pos,
                        });
                    }
                    if let Some(row) = self.rows.get_mut(pos) {
                        if row.content != content {
                            row.content = content;
                            patches.push(Patch::Update {
                                id: node.id().clone(),
                            });
                        }
                    }
                }
            }
        }
        patches
    }

    fn rebuild(
        &mut self,
        desired: &[Arc<Node>],
        metrics: &MetricsTable,
        observer: &dyn RowObserver,
    ) -> Vec<Patch> {
        observer.unobserve_all();
        self.placeholder = None;
        let mut patches = vec![Patch::Clear];
        self.rows = Vec::with_capacity(desired.len());
        for (at, node) in desired.iter().enumerate() {
            let row = self.new_row(node, RowContent::of(node, metrics), observer);
            self.rows.push(row);
            patches.push(Patch::Insert {
                id: node.id().clone(),
                at,
            });
        }
        patches
    }

    fn new_row(&mut self, node: &Node, content: RowContent, observer: &dyn RowObserver) -> RenderedRow {
        self.next_handle += 1;
        RenderedRow {
            handle: RowHandle(self.next_handle),
            node_id: node.id().clone(),
            subscription: observer.observe(node.id()),
            content,
        }
    }
}
