//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of the catalog display name, the
//! Steam app id and the news `gid` used as a change token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Steam application id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AppId {
    fn from(n: u64) -> Self {
        AppId(n)
    }
}

/// The unique display name of a catalog entry.
///
/// Names double as checkpoint keys, so two catalog entries may never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityName(pub String);

impl EntityName {
    pub fn new(s: impl Into<String>) -> Self {
        EntityName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityName {
    fn from(s: &str) -> Self {
        EntityName(s.to_string())
    }
}

impl From<String> for EntityName {
    fn from(s: String) -> Self {
        EntityName(s)
    }
}

/// Opaque token identifying the most recent change seen for an entity.
///
/// For Steam news this is the item's `gid`. Tokens are only ever compared for
/// equality; no ordering is implied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeToken(pub String);

impl ChangeToken {
    pub fn new(s: impl Into<String>) -> Self {
        ChangeToken(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChangeToken {
    fn from(s: &str) -> Self {
        ChangeToken(s.to_string())
    }
}
