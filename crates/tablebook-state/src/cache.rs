//! The availability cache.
//!
//! A best-effort, client-held copy of the roster and of the most recent
//! booking queries. It is never authoritative. Every slice is replaced
//! wholesale on refresh; there is no expiry.
//!
//! The cache is created as a [`CacheWriter`] / [`CacheReader`] pair. The
//! writer is owned by the orchestrator; views only ever hold readers.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tablebook_core::{Booking, BookingKey, Table};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::slice::{RefreshTicket, Selection, Slice, SliceKind, SliceMeta};
use crate::snapshot::CacheSnapshot;
use crate::subscription::{CacheEvent, CacheSubscription, ChangeType, SliceFilter, SubscriptionManager};

struct CacheState {
    tables: Slice<Table>,
    by_date: Slice<Booking>,
    by_user: Slice<Booking>,
    calendar: Slice<Booking>,
}

impl CacheState {
    fn new() -> Self {
        Self {
            tables: Slice::new(SliceKind::Tables),
            by_date: Slice::new(SliceKind::ByDate),
            by_user: Slice::new(SliceKind::ByUser),
            calendar: Slice::new(SliceKind::Calendar),
        }
    }

    fn bookings_mut(&mut self, kind: SliceKind) -> Option<&mut Slice<Booking>> {
        match kind {
            SliceKind::ByDate => Some(&mut self.by_date),
            SliceKind::ByUser => Some(&mut self.by_user),
            SliceKind::Calendar => Some(&mut self.calendar),
            SliceKind::Tables => None,
        }
    }

    fn bookings(&self, kind: SliceKind) -> &[Booking] {
        match kind {
            SliceKind::ByDate => self.by_date.rows(),
            SliceKind::ByUser => self.by_user.rows(),
            SliceKind::Calendar => self.calendar.rows(),
            SliceKind::Tables => &[],
        }
    }

    fn meta(&self, kind: SliceKind) -> SliceMeta {
        match kind {
            SliceKind::Tables => self.tables.meta(),
            SliceKind::ByDate => self.by_date.meta(),
            SliceKind::ByUser => self.by_user.meta(),
            SliceKind::Calendar => self.calendar.meta(),
        }
    }

    fn requested(&self, kind: SliceKind) -> Option<&Selection> {
        match kind {
            SliceKind::Tables => self.tables.requested(),
            SliceKind::ByDate => self.by_date.requested(),
            SliceKind::ByUser => self.by_user.requested(),
            SliceKind::Calendar => self.calendar.requested(),
        }
    }

    fn len(&self, kind: SliceKind) -> usize {
        match kind {
            SliceKind::Tables => self.tables.rows().len(),
            other => self.bookings(other).len(),
        }
    }
}

struct Shared {
    state: RwLock<CacheState>,
    events: SubscriptionManager,
}

impl Shared {
    fn publish(&self, state: &CacheState, slice: SliceKind, change: ChangeType) {
        let meta = state.meta(slice);
        self.events.publish(CacheEvent {
            slice,
            change,
            selection: meta.selection,
            generation: meta.generation,
            len: state.len(slice),
            at: Utc::now(),
        });
    }
}

/// Create an empty cache, returning its single writer and a reader.
pub fn availability_cache() -> (CacheWriter, CacheReader) {
    let shared = Arc::new(Shared {
        state: RwLock::new(CacheState::new()),
        events: SubscriptionManager::new(),
    });
    (
        CacheWriter {
            shared: shared.clone(),
        },
        CacheReader { shared },
    )
}

/// The write half of the cache.
pub struct CacheWriter {
    shared: Arc<Shared>,
}

impl CacheWriter {
    /// A new reader over the same cache.
    pub fn reader(&self) -> CacheReader {
        CacheReader {
            shared: self.shared.clone(),
        }
    }

    /// Start a roster refresh.
    pub async fn begin_tables(&self) -> RefreshTicket {
        self.shared.state.write().await.tables.begin(Selection::All)
    }

    /// Start a by-date refresh, making `date` the current selection.
    pub async fn begin_by_date(&self, date: NaiveDate) -> RefreshTicket {
        self.shared.state.write().await.by_date.begin(Selection::Date(date))
    }

    /// Start a by-user refresh, making `user_id` the current selection.
    pub async fn begin_by_user(&self, user_id: &str) -> RefreshTicket {
        self.shared
            .state
            .write()
            .await
            .by_user
            .begin(Selection::User(user_id.to_string()))
    }

    /// Start a calendar refresh.
    pub async fn begin_calendar(&self) -> RefreshTicket {
        self.shared.state.write().await.calendar.begin(Selection::All)
    }

    /// Replace the roster. Returns false if the result was superseded.
    pub async fn apply_tables(&self, ticket: &RefreshTicket, tables: Vec<Table>) -> bool {
        let mut state = self.shared.state.write().await;
        let applied = state.tables.apply(ticket, tables);
        self.finish(&state, ticket, applied);
        applied
    }

    /// Replace a booking slice. Returns false if the result was superseded.
    pub async fn apply_bookings(&self, ticket: &RefreshTicket, bookings: Vec<Booking>) -> bool {
        let mut state = self.shared.state.write().await;
        let applied = match state.bookings_mut(ticket.slice()) {
            Some(slice) => slice.apply(ticket, bookings),
            None => false,
        };
        self.finish(&state, ticket, applied);
        applied
    }

    fn finish(&self, state: &CacheState, ticket: &RefreshTicket, applied: bool) {
        if applied {
            tracing::debug!(
                slice = ?ticket.slice(),
                selection = ?ticket.selection(),
                generation = ticket.generation(),
                "slice replaced"
            );
            self.shared.publish(state, ticket.slice(), ChangeType::Replaced);
        } else {
            tracing::debug!(
                slice = ?ticket.slice(),
                selection = ?ticket.selection(),
                generation = ticket.generation(),
                "discarding superseded result"
            );
        }
    }

    /// Remove a booking from every booking slice. Returns the number removed.
    pub async fn evict(&self, key: &BookingKey) -> usize {
        let mut state = self.shared.state.write().await;
        let mut removed = 0;
        for kind in [SliceKind::ByDate, SliceKind::ByUser, SliceKind::Calendar] {
            let count = state
                .bookings_mut(kind)
                .map(|slice| slice.retain(|b| !b.matches(key)))
                .unwrap_or(0);
            if count > 0 {
                self.shared.publish(&state, kind, ChangeType::Evicted);
                removed += count;
            }
        }
        removed
    }
}

/// A read-only handle on the cache.
#[derive(Clone)]
pub struct CacheReader {
    shared: Arc<Shared>,
}

impl CacheReader {
    /// The current roster.
    pub async fn tables(&self) -> Vec<Table> {
        self.shared.state.read().await.tables.rows().to_vec()
    }

    /// Look up a table by id.
    pub async fn find_table(&self, table_id: &str) -> Option<Table> {
        let state = self.shared.state.read().await;
        state
            .tables
            .rows()
            .iter()
            .find(|t| t.table_id == table_id)
            .cloned()
    }

    /// Bookings from the most recent by-date query.
    pub async fn bookings_by_date(&self) -> Vec<Booking> {
        self.bookings(SliceKind::ByDate).await
    }

    /// Bookings from the most recent by-user query.
    pub async fn bookings_by_user(&self) -> Vec<Booking> {
        self.bookings(SliceKind::ByUser).await
    }

    /// Every booking from the most recent calendar load.
    pub async fn calendar(&self) -> Vec<Booking> {
        self.bookings(SliceKind::Calendar).await
    }

    /// Rows of a booking slice. Empty for [`SliceKind::Tables`].
    pub async fn bookings(&self, kind: SliceKind) -> Vec<Booking> {
        self.shared.state.read().await.bookings(kind).to_vec()
    }

    /// The by-date slice ordered by start time, then table.
    pub async fn timeline(&self) -> Vec<Booking> {
        let mut bookings = self.bookings_by_date().await;
        bookings.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.table_id.cmp(&b.table_id))
        });
        bookings
    }

    /// Metadata for a slice.
    pub async fn meta(&self, kind: SliceKind) -> SliceMeta {
        self.shared.state.read().await.meta(kind)
    }

    /// Selection of the most recently issued query for a slice.
    ///
    /// This moves as soon as a query is issued, before it succeeds; the
    /// selection the rows reflect is in [`CacheReader::meta`].
    pub async fn requested(&self, kind: SliceKind) -> Option<Selection> {
        self.shared.state.read().await.requested(kind).cloned()
    }

    /// Time since a slice was last replaced.
    pub async fn staleness(&self, kind: SliceKind) -> Option<chrono::Duration> {
        self.meta(kind).await.staleness()
    }

    /// Take an immutable copy of every slice.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let state = self.shared.state.read().await;
        CacheSnapshot {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            tables: state.tables.rows().to_vec(),
            by_date: state.by_date.rows().to_vec(),
            by_user: state.by_user.rows().to_vec(),
            calendar: state.calendar.rows().to_vec(),
            meta: SliceKind::ALL.iter().map(|k| (*k, state.meta(*k))).collect(),
        }
    }

    /// Subscribe to slice changes.
    pub async fn subscribe(&self, filter: SliceFilter) -> CacheSubscription {
        self.shared.events.subscribe(filter).await
    }

    /// Drop a subscription's registration.
    pub async fn unsubscribe(&self, id: Uuid) {
        self.shared.events.unsubscribe(id).await
    }

    /// Get the number of active subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.shared.events.subscription_count().await
    }
}
