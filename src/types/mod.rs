//! Core domain types for the watcher.

pub mod change;
pub mod entity;
pub mod ids;

pub use change::ChangeRecord;
pub use entity::{Entity, WorkItem};
pub use ids::{AppId, ChangeToken, EntityName};
