//! Persistence layer for the watcher.
//!
//! Only one thing is persisted: the checkpoint map of entity name → last seen
//! change token. The pending-notification queue is deliberately in-memory.
//!
//! # Crash Safety
//!
//! - The checkpoint file is replaced atomically (temp file + fsync + rename +
//!   directory fsync).
//! - The scan loop flushes every N entities and at the end of each pass, so a
//!   crash loses at most one batch of baselines. Those entities are re-detected
//!   on the next run rather than silently skipped.

pub mod atomic;
pub mod checkpoint;

pub use atomic::write_atomic;
pub use checkpoint::{CheckpointError, CheckpointStore};
