use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cache::DetailCache;
use crate::model::NodeId;
use crate::source::DetailSource;

/// Handle of one row's visibility subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Waiting for the row to become visible.
    Watching,
    /// Prefetch issued, not yet settled.
    Pending,
    Fetched,
    Failed,
}

/// Observer the reconciliation engine attaches rendered rows to.
pub trait RowObserver: Send + Sync {
    fn observe(&self, id: &NodeId) -> SubscriptionId;
    fn unobserve(&self, subscription: SubscriptionId);
    fn unobserve_all(&self);
}

#[derive(Debug, Clone)]
struct Subscription {
    node: NodeId,
    state: SubscriptionState,
}

/// One-shot detail prefetch for rows entering the viewport.
///
/// Each rendered row holds a subscription. The first visibility report for
/// it fires exactly one `get_detail`; later reports are ignored. Failures
/// are logged and recorded on the subscription, never surfaced. A result
/// arriving after its row was unobserved is discarded.
pub struct VisibilityScheduler<S> {
    cache: Arc<DetailCache<S>>,
    next: AtomicU64,
    subscriptions: DashMap<SubscriptionId, Subscription>,
    by_node: DashMap<NodeId, SubscriptionId>,
}

impl<S: DetailSource> VisibilityScheduler<S> {
    pub fn new(cache: Arc<DetailCache<S>>) -> Self {
        Self {
            cache,
            next: AtomicU64::new(1),
            subscriptions: DashMap::new(),
            by_node: DashMap::new(),
        }
    }

    pub fn state(&self, subscription: SubscriptionId) -> Option<SubscriptionState> {
        self.subscriptions.get(&subscription).map(|s| s.state)
    }

    pub fn subscription_for(&self, id: &NodeId) -> Option<SubscriptionId> {
        self.by_node.get(id).map(|s| *s.value())
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Report that the row for `id` is in view.
    ///
    /// Returns the prefetch task when this report started one.
    pub fn mark_visible(self: &Arc<Self>, id: &NodeId) -> Option<JoinHandle<()>> {
        let subscription = self.subscription_for(id)?;
        {
            let mut entry = self.subscriptions.get_mut(&subscription)?;
            if entry.state != SubscriptionState::Watching {
                return None;
            }
            entry.state = SubscriptionState::Pending;
        }

        let this = Arc::clone(self);
        let id = id.clone();
        Some(tokio::spawn(async move {
            let result = this.cache.get_detail(&id).await;
            let Some(mut entry) = this.subscriptions.get_mut(&subscription) else {
                debug!(node_id = %id, "row gone before prefetch settled, discarding");
                return;
            };
            entry.state = match result {
                Ok(_) => SubscriptionState::Fetched,
                Err(e) => {
                    warn!(node_id = %id, error = %e, "visibility prefetch failed");
                    SubscriptionState::Failed
                }
            };
        }))
    }
}

impl<S: DetailSource> RowObserver for VisibilityScheduler<S> {
    fn observe(&self, id: &NodeId) -> SubscriptionId {
        let subscription = SubscriptionId::new(self.next.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.insert(
            subscription,
            Subscription {
                node: id.clone(),
                state: SubscriptionState::Watching,
            },
        );
        if let Some(previous) = self.by_node.insert(id.clone(), subscription) {
            self.subscriptions.remove(&previous);
        }
        subscription
    }

    fn unobserve(&self, subscription: SubscriptionId) {
        if let Some((_, sub)) = self.subscriptions.remove(&subscription) {
            self.by_node.remove_if(&sub.node, |_, current| *current == subscription);
        }
    }

    fn unobserve_all(&self) {
        self.subscriptions.clear();
        self.by_node.clear();
    }
}
