//! Catalog entities and the work items derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::ChangeRecord;
use super::ids::{AppId, EntityName};

/// One watched app from the catalog.
///
/// Entities are immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: EntityName,

    #[serde(rename = "appId")]
    pub app_id: AppId,
}

impl Entity {
    pub fn new(name: impl Into<EntityName>, app_id: impl Into<AppId>) -> Self {
        Entity {
            name: name.into(),
            app_id: app_id.into(),
        }
    }
}

/// A detected change waiting to be announced.
///
/// Created by the scan loop when an entity's change token moves, and consumed
/// by the dispatch loop. The scan loop gives up ownership at enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub entity_name: EntityName,
    pub app_id: AppId,
    pub change: ChangeRecord,
    pub detected_at: DateTime<Utc>,
}

impl WorkItem {
    /// Creates a work item stamped with the current time.
    pub fn new(entity: &Entity, change: ChangeRecord) -> Self {
        Self::stamped(entity, change, Utc::now())
    }

    pub fn stamped(entity: &Entity, change: ChangeRecord, at: DateTime<Utc>) -> Self {
        WorkItem {
            entity_name: entity.name.clone(),
            app_id: entity.app_id,
            change,
            detected_at: at,
        }
    }
}
