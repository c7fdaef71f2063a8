//! Beacon Core - Entity Types
//!
//! Data types shared by every crate in the beacon workspace: the event
//! record, search filters and page shapes, aggregate statistics, and the
//! error taxonomy. All other crates depend on this.

pub mod error;
pub mod event;
pub mod filter;
pub mod stats;

pub use error::{
    BeaconError, BeaconResult, BusError, CacheError, SearchError, StoreError, ValidationError,
};
pub use event::{new_event_id, Event, EventId, NewEvent, Timestamp};
pub use filter::{DateRange, PageResult, SearchFilters, SortDirection, SortField};
pub use stats::{DailyCount, EventStats, MessageCount};
