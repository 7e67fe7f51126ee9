//! Resolved-file change notifications.

use modcache_core::{CollectionId, ModKey, Payload, VirtualPath};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Added,
    Replaced,
    Removed,
}

/// A virtual path started, stopped or changed resolving in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFileChanged {
    pub collection: CollectionId,
    pub kind: ChangeKind,
    pub path: VirtualPath,
    pub new: Option<Payload>,
    pub old: Option<Payload>,
    /// Owner after the change, or the former owner for [`ChangeKind::Removed`].
    pub owner: ModKey,
}

/// Observer invoked synchronously for every change.
pub type ChangeCallback = Arc<dyn Fn(&ResolvedFileChanged) + Send + Sync>;
