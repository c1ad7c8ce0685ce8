//! Patchwatch - watches a catalog of Steam apps for new patch notes and
//! announces each change on a Discord webhook.
//!
//! Two long-running loops share a pending queue:
//! - the scan loop ([`scan`]) detects changes and enqueues them
//! - the dispatch loop ([`dispatch`]) enriches and delivers them at a fixed rate

pub mod catalog;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod enrich;
pub mod persistence;
pub mod queue;
pub mod scan;
pub mod server;
pub mod shutdown;
pub mod types;
pub mod upstream;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_utils;
