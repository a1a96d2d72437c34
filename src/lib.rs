//! # BearDB
//!
//! An embedded, single-file record store with:
//! - Stable record ids (the byte offset of the payload)
//! - Deterministic smallest-fit reuse of deleted space
//! - Single-hop redirects for records that outgrow their slot
//! - Explicit defragmentation of adjacent tombstones
//! - One reader/writer lock for the whole store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Store<K, V>                              │
//! │          (typed entries: value ++ key payloads)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Serial encode / decode
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                 │
//! │     alloc | redirect | compact | scan   (RwLock)            │
//! └──────────┬─────────────────────────────────┬────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐               ┌─────────────────┐
//!   │ FreeSpaceIndex  │               │     Backend     │
//!   │ (by capacity /  │               │  File | Memory  │
//!   │  by offset)     │               └────────┬────────┘
//!   └────────┬────────┘                        │
//!            ▼                                 ▼
//!     <data>.free sidecar              preamble + records
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod backend;
pub mod record;
pub mod free_space;
pub mod serial;
pub mod engine;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use backend::{Backend, FileBackend, MemoryBackend};
pub use config::{Config, ConfigBuilder, FreeIndexRecovery};
pub use engine::{DefragReport, Engine, RecordInfo, Stats};
pub use error::{BearError, Result};
pub use free_space::FreeSpaceIndex;
pub use serial::{Bincode, Serial};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BearDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
