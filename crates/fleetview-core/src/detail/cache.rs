use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::error::DetailFetchError;
use crate::model::{DetailRecord, NodeId};
use crate::normalize::Normalizer;
use crate::source::DetailSource;

type PendingDetail = Shared<BoxFuture<'static, Result<Arc<DetailRecord>, DetailFetchError>>>;

/// Session-lifetime detail store with at most one in-flight fetch per node.
///
/// Concurrent callers for the same id share one pending future. Successful
/// records stay cached; failures only clear the pending marker, so the next
/// call retries.
pub struct DetailCache<S> {
    source: Arc<S>,
    normalizer: Normalizer,
    resolved: DashMap<NodeId, Arc<DetailRecord>>,
    pending: DashMap<NodeId, PendingDetail>,
}

impl<S: DetailSource> DetailCache<S> {
    pub fn new(source: Arc<S>, normalizer: Normalizer) -> Self {
        Self {
            source,
            normalizer,
            resolved: DashMap::new(),
            pending: DashMap::new(),
        }
    }

    pub fn cached(&self, id: &NodeId) -> Option<Arc<DetailRecord>> {
        self.resolved.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn is_pending(&self, id: &NodeId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub async fn get_detail(&self, id: &NodeId) -> Result<Arc<DetailRecord>, DetailFetchError> {
        if let Some(hit) = self.cached(id) {
            return Ok(hit);
        }

        let fut = match self.pending.entry(id.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                // A fetch may have resolved between the lookup above and here.
                if let Some(hit) = self.cached(id) {
                    return Ok(hit);
                }
                let source = Arc::clone(&self.source);
                let normalizer = self.normalizer.clone();
                let key = id.clone();
                let fut = async move {
                    let raw = source.fetch_detail(&key).await?;
                    Ok(Arc::new(normalizer.normalize_detail(raw, Utc::now())))
                }
                .boxed()
                .shared();
                debug!(node_id = %id, "detail fetch started");
                entry.insert(fut.clone());
                fut
            }
        };

        let result = fut.clone().await;
        if let Ok(record) = &result {
            self.resolved
                .entry(id.clone())
                .or_insert_with(|| Arc::clone(record));
        }
        // Only clear our own marker; a retry may already have replaced it.
        self.pending.remove_if(id, |_, pending| pending.ptr_eq(&fut));
        result
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fake::FakeSource;
    use super::*;

    fn cache(source: FakeSource) -> (Arc<FakeSource>, Arc<DetailCache<FakeSource>>) {
        let source = Arc::new(source);
        let cache = Arc::new(DetailCache::new(Arc::clone(&source), Normalizer::default()));
        (source, cache)
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let (source, cache) = cache(FakeSource::gated());
        let id = NodeId::from("7");

        let a = tokio::spawn({
            let cache = Arc::clone(&cache);
            let id = id.clone();
            async move { cache.get_detail(&id).await }
        });
        let b = tokio::spawn({
            let cache = Arc::clone(&cache);
            let id = id.clone();
            async move { cache.get_detail(&id).await }
        });

        while source.detail_calls() == 0 {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert!(cache.is_pending(&id));
        source.release(1);

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.detail_calls(), 1);
        assert!(!cache.is_pending(&id));

        // Served from cache from now on.
        cache.get_detail(&id).await.unwrap();
        assert_eq!(source.detail_calls(), 1);
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let source = FakeSource::default();
        source.fail_detail("7", 1);
        let (source, cache) = cache(source);
        let id = NodeId::from("7");

        let err = cache.get_detail(&id).await.unwrap_err();
        assert!(matches!(err, DetailFetchError::Unreachable { .. }));
        assert!(cache.cached(&id).is_none());
        assert!(!cache.is_pending(&id));

        let record = cache.get_detail(&id).await.unwrap();
        assert_eq!(record.private_ip, "10.0.0.7");
        assert_eq!(source.detail_calls(), 2);
    }
}
