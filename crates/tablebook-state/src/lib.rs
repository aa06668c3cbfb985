//! # Tablebook State
//!
//! Client-side availability cache with race-safe slice refreshes.

pub mod cache;
pub mod slice;
pub mod snapshot;
pub mod subscription;

pub use cache::{availability_cache, CacheReader, CacheWriter};
pub use slice::{RefreshTicket, Selection, SliceKind, SliceMeta};
pub use snapshot::CacheSnapshot;
pub use subscription::{CacheEvent, CacheSubscription, ChangeType, SliceFilter};
