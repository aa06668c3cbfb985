//! Point-in-time copies of the cache for rendering.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tablebook_core::{Booking, CalendarEvent, Table};
use uuid::Uuid;

use crate::slice::{SliceKind, SliceMeta};

/// A point-in-time snapshot of every slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Unique ID for this snapshot.
    pub id: Uuid,

    /// Timestamp when the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// The roster.
    pub tables: Vec<Table>,

    /// Bookings for the selected date.
    pub by_date: Vec<Booking>,

    /// Bookings for the selected user.
    pub by_user: Vec<Booking>,

    /// Every booking.
    pub calendar: Vec<Booking>,

    /// Metadata per slice.
    pub meta: HashMap<SliceKind, SliceMeta>,
}

impl CacheSnapshot {
    /// Metadata for a slice.
    pub fn meta(&self, kind: SliceKind) -> Option<&SliceMeta> {
        self.meta.get(&kind)
    }

    /// The date the by-date rows reflect.
    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.meta(SliceKind::ByDate)?.selection.as_ref()?.as_date()
    }

    /// The user the by-user rows reflect.
    pub fn selected_user(&self) -> Option<&str> {
        self.meta(SliceKind::ByUser)?.selection.as_ref()?.as_user()
    }

    /// Calendar rows as events.
    pub fn calendar_events(&self) -> Vec<CalendarEvent> {
        self.calendar.iter().map(CalendarEvent::from).collect()
    }

    /// Look up a table by id.
    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.table_id == table_id)
    }

    /// Check if every slice is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.by_date.is_empty()
            && self.by_user.is_empty()
            && self.calendar.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::availability_cache;
    use crate::slice::Selection;

    #[tokio::test]
    async fn test_snapshot_selection_helpers() {
        let (writer, reader) = availability_cache();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let t = writer.begin_by_date(date).await;
        writer.apply_bookings(&t, Vec::new()).await;
        let t = writer.begin_by_user("alice").await;
        writer.apply_bookings(&t, Vec::new()).await;

        let snapshot = reader.snapshot().await;
        assert_eq!(snapshot.selected_date(), Some(date));
        assert_eq!(snapshot.selected_user(), Some("alice"));
        assert!(snapshot.is_empty());
        assert_eq!(
            snapshot.meta(SliceKind::Tables).unwrap().selection,
            None::<Selection>
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = CacheSnapshot {
            id: Uuid::new_v4(),
            taken_at: Utc::now(),
            tables: vec![Table::new("T1", 4)],
            by_date: Vec::new(),
            by_user: Vec::new(),
            calendar: Vec::new(),
            meta: HashMap::new(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["tables"][0]["tableId"], "T1");
        assert!(snapshot.table("T1").is_some());
    }
}
