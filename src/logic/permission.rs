use serde::Serialize;
use std::collections::HashSet;

use crate::logic::state::OverrideState;
use crate::model::{ResourceType, SectionRef};

/// Capability check wrapped around every mutating affordance
pub trait PermissionGate: Send + Sync {
    fn can_edit(&self, resource: ResourceType) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn can_edit(&self, _resource: ResourceType) -> bool {
        true
    }
}

/// Fixed set of editable resource types, e.g. resolved once at page load
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    editable: HashSet<ResourceType>,
}

impl StaticPermissions {
    pub fn new(editable: impl IntoIterator<Item = ResourceType>) -> Self {
        Self {
            editable: editable.into_iter().collect(),
        }
    }

    pub fn read_only() -> Self {
        Self::default()
    }
}

impl PermissionGate for StaticPermissions {
    fn can_edit(&self, resource: ResourceType) -> bool {
        self.editable.contains(&resource)
    }
}

/// Which actions the rendering layer should enable for one section.
/// Disabled actions stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Affordances {
    pub new_section: bool,
    pub edit_rows: bool,
    pub delete_section: bool,
    pub save: bool,
    pub discard: bool,
}

pub fn affordances(state: &OverrideState, section: SectionRef) -> Affordances {
    let permitted = state.can_edit();
    let holder = state.session.holder();
    let free_or_mine = holder.map_or(true, |h| h == section);
    let mine = holder == Some(section);
    let exists = state.list.section(section).is_some();

    Affordances {
        new_section: permitted && holder.map_or(true, |h| h == SectionRef::New),
        edit_rows: permitted && exists && free_or_mine,
        delete_section: permitted
            && exists
            && section != SectionRef::New
            && free_or_mine,
        save: permitted && exists && mine,
        discard: exists && mine,
    }
}
