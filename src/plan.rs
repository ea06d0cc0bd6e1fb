use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use super::key_resolver;
use super::store::RemoteObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    NotPresent,
    SizeDiffers,
    ETagDiffers,
}

impl fmt::Display for CopyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyReason::NotPresent => write!(f, "not present"),
            CopyReason::SizeDiffers => write!(f, "size differs"),
            CopyReason::ETagDiffers => write!(f, "ETag differs"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Copy(CopyReason),
    Skip,
}

#[derive(Debug, Clone)]
pub struct PlannedObject {
    pub source: RemoteObject,
    pub destination: String,
    pub action: Action,
}

/// Sorts a source listing into sync order: deepest keys first, and within
/// one depth the entry-point files last. Ties keep their listing order.
pub fn sort_for_sync(objects: &mut [RemoteObject]) {
    objects.sort_by_key(|o| {
        Reverse((key_resolver::depth(&o.key), !key_resolver::is_anchor(&o.key)))
    });
}

/// Decides whether `source` has to be copied over `existing`.
pub fn decide(source: &RemoteObject, existing: Option<&RemoteObject>) -> Action {
    match existing {
        None => Action::Copy(CopyReason::NotPresent),
        Some(dst) if dst.size != source.size => Action::Copy(CopyReason::SizeDiffers),
        Some(dst) if dst.e_tag != source.e_tag => Action::Copy(CopyReason::ETagDiffers),
        Some(_) => Action::Skip,
    }
}

/// Ordered copy/skip decisions for one promotion.
#[derive(Debug, Default)]
pub struct SyncPlan {
    entries: Vec<PlannedObject>,
}

impl SyncPlan {
    /// `targets` must already be in sync order. `destination` maps
    /// destination keys to the objects currently stored there.
    pub fn build(
        targets: Vec<(RemoteObject, String)>,
        destination: &HashMap<String, RemoteObject>,
    ) -> SyncPlan {
        let entries = targets
            .into_iter()
            .map(|(source, path)| {
                let action = decide(&source, destination.get(&path));
                PlannedObject {
                    source,
                    destination: path,
                    action,
                }
            })
            .collect();
        SyncPlan { entries }
    }

    pub fn entries(&self) -> &[PlannedObject] {
        &self.entries
    }

    pub fn copy_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.action, Action::Copy(_)))
            .count()
    }
}
