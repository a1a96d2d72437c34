//! Free-Space Index Module
//!
//! Tracks tombstoned regions that can be handed out again.
//!
//! ## Responsibilities
//! - Map free slot id → reusable payload capacity
//! - Deterministic smallest-fit lookup (ties go to the lowest offset)
//! - Absorb slots freed by delete / defrag, drop slots consumed by allocation
//! - Remember which live records are relocated redirect bodies
//! - Persist to a sidecar file across restarts
//!
//! ## Data Structure Choice
//! Two BTree views over the same entries, kept in lockstep:
//! - `by_offset`: exact lookup/removal by id (defrag, growth)
//! - `by_capacity`: ordered by (capacity, offset) for smallest-fit
//!
//! The index is plain data; the engine owns it and only touches it while
//! holding its exclusive lock.

mod index;
mod persist;

pub use index::FreeSpaceIndex;
pub use persist::{sidecar_path, SIDECAR_MAGIC, SIDECAR_VERSION};
