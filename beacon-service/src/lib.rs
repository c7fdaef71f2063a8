//! Beacon Service - Orchestration Layer
//!
//! Composes the four collaborators - primary store, search index, message
//! bus, and tagged cache - into the create/read/search/stats operations,
//! with cache-aside reads and detached post-write side effects.
//!
//! Every collaborator is injected through the constructor; the service
//! holds no global state. The primary store is the only authoritative
//! dependency: a request fails only when validation, a lookup, or the
//! store itself fails. Search and cache failures degrade transparently and
//! are visible in logs alone.

pub mod cache_keys;
pub mod config;
pub mod constants;
pub mod notify;
pub mod service;

pub use cache_keys::{derive_key, derive_tags, filter_params};
pub use config::CachePolicy;
pub use notify::{Notifier, ServiceEvent};
pub use service::{BusCreateHandler, EventService};
