//! # Availability Engine
//!
//! A near-real-time, searchable view of restaurant table availability,
//! derived from reservation lifecycle events and served with low-latency
//! caching.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────────────────┐
//!  reservation.*     │              Event Consumer             │
//!  stream  ─────────▶│  • consumer-group reads, explicit acks  │
//!                    │  • poison messages dropped, failures    │
//!                    │    left pending for redelivery          │
//!                    └────────────────────┬────────────────────┘
//!                                         ▼
//!                    ┌─────────────────────────────────────────┐
//!                    │              Synchronizer               │
//!                    │  • fetches the authoritative snapshot   │
//!                    │  • recomputes the full document         │
//!                    │  • writes through the document store    │
//!                    │  • clears the hybrid cache wholesale    │
//!                    └──────┬─────────────────────┬────────────┘
//!                           ▼                     ▼
//!              ┌────────────────────┐  ┌─────────────────────┐
//!              │   Document Store   │  │    Hybrid Cache     │
//!              │  RediSearch over   │  │  local RwLock map   │
//!              │  JSON documents    │  │  + optional shared  │
//!              └────────────────────┘  │    Redis tier       │
//!                           ▲          └─────────────────────┘
//!                           │                     ▲
//!                    ┌──────┴─────────────────────┴────────────┐
//!                    │             Search Service              │
//!                    │  normalize → cache key → hit? → engine  │
//!                    └─────────────────────────────────────────┘
//! ```
//!
//! ## Correctness model
//!
//! Events are pointers and may arrive duplicated or out of order. The
//! synchronizer therefore recomputes every document wholesale from the
//! reservation source instead of applying deltas; replays converge to the
//! same state. Query normalization is a pure function whose canonical
//! serialization doubles as the cache key, and writes invalidate the cache
//! coarsely rather than tracking per-key dependencies.
//!
//! ## Modules
//!
//! - [`query`]: query normalization (raw input → engine-safe syntax)
//! - [`index`]: availability document store (RediSearch + in-memory)
//! - [`cache`]: hybrid two-tier read-through cache
//! - [`sync`]: event synchronizer
//! - [`consumer`]: broker consumer driving the synchronizer
//! - [`service`]: read-path orchestration
//! - [`reindex`]: supervised bulk rebuild
//! - [`api`]: HTTP surface
//! - [`resilience`]: retry policies for backend calls

pub mod api;
pub mod cache;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod event;
pub mod index;
pub mod metrics;
pub mod query;
pub mod reindex;
pub mod reservations;
pub mod resilience;
pub mod service;
pub mod sync;

pub use cache::{CacheCodec, CacheStats, DistributedCache, HybridCache, JsonCodec};
pub use config::AppConfig;
pub use consumer::EventConsumer;
pub use domain::{ReservationSnapshot, TableAvailability};
pub use event::{EventOp, ReservationEvent};
pub use index::{AvailabilityStore, IndexError, MemoryStore, RediSearchStore, SearchResult};
pub use query::{normalize, NormalizedQuery, SearchQuery};
pub use reindex::Reindexer;
pub use reservations::{ReservationClient, ReservationError, ReservationSource};
pub use service::SearchService;
pub use sync::{SyncError, Synchronizer};
