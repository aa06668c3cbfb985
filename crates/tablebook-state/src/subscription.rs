//! Cache change subscriptions.
//!
//! Views subscribe to learn when a slice was replaced or trimmed, then read
//! the new rows through a [`crate::CacheReader`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::slice::{Selection, SliceKind};

/// A cache change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEvent {
    /// The slice that changed.
    pub slice: SliceKind,

    /// Type of change.
    pub change: ChangeType,

    /// Selection the slice now reflects.
    pub selection: Option<Selection>,

    /// Generation of the rows after the change.
    pub generation: u64,

    /// Number of rows after the change.
    pub len: usize,

    /// Timestamp of the change.
    pub at: DateTime<Utc>,
}

/// Type of cache change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Rows were replaced by a refresh.
    Replaced,
    /// A cancelled booking was removed locally.
    Evicted,
}

/// Filter for subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SliceFilter {
    /// Slices to watch (None = all).
    pub slices: Option<Vec<SliceKind>>,
}

impl SliceFilter {
    /// Watch every slice.
    pub fn all() -> Self {
        Self::default()
    }

    /// Watch the given slices only.
    pub fn slices(slices: impl IntoIterator<Item = SliceKind>) -> Self {
        Self {
            slices: Some(slices.into_iter().collect()),
        }
    }

    /// Whether `event` should be delivered.
    pub fn matches(&self, event: &CacheEvent) -> bool {
        match &self.slices {
            Some(slices) => slices.contains(&event.slice),
            None => true,
        }
    }
}

/// Registered subscriptions by id.
type Registry = Arc<RwLock<HashMap<Uuid, SliceFilter>>>;

/// A subscription to cache changes.
///
/// Delivery stops once the subscription is removed with
/// [`SubscriptionManager::unsubscribe`].
pub struct CacheSubscription {
    /// Handle used to unsubscribe.
    pub id: Uuid,

    /// Slices this subscription receives.
    pub filter: SliceFilter,

    receiver: broadcast::Receiver<CacheEvent>,

    registry: Registry,
}

impl CacheSubscription {
    /// Whether the subscription is still registered.
    pub async fn is_active(&self) -> bool {
        self.registry.read().await.contains_key(&self.id)
    }

    /// Wait for the next matching event.
    ///
    /// Returns `None` once the cache is dropped or the subscription has been
    /// removed. Events missed by a lagging subscriber are skipped.
    pub async fn next(&mut self) -> Option<CacheEvent> {
        loop {
            if !self.is_active().await {
                return None;
            }
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    // unsubscribed while waiting
                    if !self.is_active().await {
                        return None;
                    }
                    return Some(event);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(subscription = %self.id, skipped, "cache subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Turn the subscription into a stream of matching events.
    ///
    /// The stream ends when the subscription is removed.
    pub fn into_stream(self) -> impl Stream<Item = CacheEvent> + Send + 'static {
        let filter = self.filter;
        let registry = self.registry;
        let id = self.id;
        BroadcastStream::new(self.receiver)
            .filter_map(move |item| {
                let event = item.ok().filter(|e| filter.matches(e));
                futures::future::ready(event)
            })
            .take_while(move |_| {
                let registry = registry.clone();
                async move { registry.read().await.contains_key(&id) }
            })
    }
}

/// Manager for cache subscriptions.
pub struct SubscriptionManager {
    /// Fan-out channel shared by every subscriber.
    sender: broadcast::Sender<CacheEvent>,

    /// Active subscriptions.
    subscriptions: Registry,
}

impl SubscriptionManager {
    /// Create a manager with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to cache changes with a filter.
    pub async fn subscribe(&self, filter: SliceFilter) -> CacheSubscription {
        let id = Uuid::new_v4();
        let receiver = self.sender.subscribe();

        self.subscriptions.write().await.insert(id, filter.clone());

        CacheSubscription {
            id,
            filter,
            receiver,
            registry: self.subscriptions.clone(),
        }
    }

    /// Remove a subscription; it receives no further events.
    pub async fn unsubscribe(&self, id: Uuid) {
        self.subscriptions.write().await.remove(&id);
    }

    /// Publish a cache event.
    pub fn publish(&self, event: CacheEvent) {
        // No receivers is fine; views may not be listening
        let _ = self.sender.send(event);
    }

    /// Number of registered subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(slice: SliceKind) -> CacheEvent {
        CacheEvent {
            slice,
            change: ChangeType::Replaced,
            selection: Some(Selection::All),
            generation: 1,
            len: 0,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_filter_slices() {
        let filter = SliceFilter::slices([SliceKind::ByDate]);
        assert!(filter.matches(&event(SliceKind::ByDate)));
        assert!(!filter.matches(&event(SliceKind::ByUser)));
    }

    #[test]
    fn test_filter_all() {
        let filter = SliceFilter::all();
        for slice in SliceKind::ALL {
            assert!(filter.matches(&event(slice)));
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe() {
        let manager = SubscriptionManager::new();

        let sub = manager.subscribe(SliceFilter::default()).await;

        assert_eq!(manager.subscription_count().await, 1);

        manager.unsubscribe(sub.id).await;

        assert_eq!(manager.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribed_receives_nothing() {
        let manager = SubscriptionManager::new();
        let mut sub = manager.subscribe(SliceFilter::all()).await;
        let stream_sub = manager.subscribe(SliceFilter::all()).await;
        let stream_id = stream_sub.id;
        let mut stream = Box::pin(stream_sub.into_stream());

        manager.unsubscribe(sub.id).await;
        manager.unsubscribe(stream_id).await;
        manager.publish(event(SliceKind::Tables));

        assert!(!sub.is_active().await);
        assert!(sub.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_after_publish_drops_pending() {
        let manager = SubscriptionManager::new();
        let mut sub = manager.subscribe(SliceFilter::all()).await;

        manager.publish(event(SliceKind::ByDate));
        manager.unsubscribe(sub.id).await;

        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_next_skips_filtered_events() {
        let manager = SubscriptionManager::new();
        let mut sub = manager
            .subscribe(SliceFilter::slices([SliceKind::Tables]))
            .await;

        manager.publish(event(SliceKind::ByUser));
        manager.publish(event(SliceKind::Tables));

        let received = sub.next().await.unwrap();
        assert_eq!(received.slice, SliceKind::Tables);
    }

    #[tokio::test]
    async fn test_stream_yields_matching_events() {
        let manager = SubscriptionManager::new();
        let sub = manager
            .subscribe(SliceFilter::slices([SliceKind::Calendar]))
            .await;
        let mut stream = Box::pin(sub.into_stream());

        manager.publish(event(SliceKind::Tables));
        manager.publish(event(SliceKind::Calendar));

        let received = stream.next().await.unwrap();
        assert_eq!(received.slice, SliceKind::Calendar);
    }
}
