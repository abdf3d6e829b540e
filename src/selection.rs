//! Selection state for a list view: which entities are picked and which
//! `(entity, platform)` pairs carry a content type.
//!
//! Associations are kept independently of selection: deselecting an entity
//! leaves its associations in place, and only selected entities are dispatched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::model::{EntityId, Platform, PlatformAssociation, SUBTYPE_NONE};
use crate::notify::{Notification, Notifier, Severity};

pub struct SelectionStore {
    selected: BTreeSet<EntityId>,
    associations: BTreeMap<(EntityId, Platform), String>,
    notifier: Arc<dyn Notifier>,
}

impl SelectionStore {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            selected: BTreeSet::new(),
            associations: BTreeMap::new(),
            notifier,
        }
    }

    /// Flip membership of `id`. Returns whether it is selected afterwards.
    pub fn toggle_selected(&mut self, id: EntityId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn is_selected(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected(&self) -> &BTreeSet<EntityId> {
        &self.selected
    }

    /// Set or replace the subtype for `(id, platform)`. The `none` sentinel
    /// and a blank subtype remove the pair instead.
    pub fn set_association(&mut self, id: EntityId, platform: Platform, subtype: &str) {
        let subtype = subtype.trim();
        let notification = if subtype.is_empty() || subtype.eq_ignore_ascii_case(SUBTYPE_NONE) {
            self.associations.remove(&(id, platform));
            Notification::new(
                "Content Type Cleared",
                format!("{platform} cleared for #{id}"),
                Severity::Info,
            )
        } else {
            self.associations.insert((id, platform), subtype.to_string());
            Notification::new(
                "Content Type Selected",
                format!("{platform} {subtype} selected for #{id}"),
                Severity::Info,
            )
        };
        self.notifier.notify(&notification);
    }

    /// Set the same subtype for `platform` on every selected entity.
    pub fn assign_to_selected(&mut self, platform: Platform, subtype: &str) {
        let ids: Vec<EntityId> = self.selected.iter().copied().collect();
        for id in ids {
            self.set_association(id, platform, subtype);
        }
    }

    pub fn association_for(&self, id: EntityId, platform: Platform) -> Option<&str> {
        self.associations.get(&(id, platform)).map(String::as_str)
    }

    /// Snapshot of every association, ordered by entity then platform.
    pub fn associations(&self) -> Vec<PlatformAssociation> {
        self.associations
            .iter()
            .map(|(&(entity_id, platform), subtype)| {
                PlatformAssociation::new(entity_id, platform, subtype.clone())
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.associations.is_empty()
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
        self.associations.clear();
    }
}
