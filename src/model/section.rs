use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{OverrideKind, OverrideRecord, OverrideScope, OverrideValue};

/// Addresses a section: the new-section placeholder or a slot of the loaded page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionRef {
    New,
    Existing(usize),
}

impl SectionRef {
    /// Legacy numeric form: -1 for the placeholder
    pub fn as_index(&self) -> i64 {
        match self {
            SectionRef::New => -1,
            SectionRef::Existing(index) => *index as i64,
        }
    }
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionRef::New => f.write_str("new section"),
            SectionRef::Existing(index) => write!(f, "section {}", index),
        }
    }
}

/// One (kind, value) pair of a section, plus its editing flags
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideDetailRow {
    /// `None` until the field editor picks a kind
    pub value: Option<OverrideValue>,
    pub is_new: bool,
    pub is_edit: bool,
    pub is_clone: bool,
    pub is_expanded: bool,
}

impl OverrideDetailRow {
    pub fn from_value(value: OverrideValue) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn blank() -> Self {
        Self {
            is_new: true,
            ..Default::default()
        }
    }

    pub fn kind(&self) -> Option<OverrideKind> {
        self.value.as_ref().map(|v| v.kind())
    }

    /// Carries uncommitted work (new, clone, or edited)
    pub fn is_dirty(&self) -> bool {
        self.is_new || self.is_edit || self.is_clone
    }
}

/// Client projection of one override record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionViewModel {
    pub group_key: String,
    pub section: SectionRef,
    pub scope: OverrideScope,
    pub is_new: bool,
    pub is_edit: bool,
    pub rows: Vec<OverrideDetailRow>,
    pub record: Option<OverrideRecord>,
}

impl SectionViewModel {
    pub fn from_record(index: usize, record: OverrideRecord) -> Self {
        let rows = record
            .spec
            .values()
            .into_iter()
            .map(OverrideDetailRow::from_value)
            .collect();

        Self {
            group_key: record.scope.group_key(),
            section: SectionRef::Existing(index),
            scope: record.scope.clone(),
            is_new: false,
            is_edit: false,
            rows,
            record: Some(record),
        }
    }

    /// The synthetic section shown while a new override is being created
    pub fn placeholder(scope: OverrideScope) -> Self {
        Self {
            group_key: scope.group_key(),
            section: SectionRef::New,
            scope,
            is_new: true,
            is_edit: false,
            rows: vec![OverrideDetailRow::blank()],
            record: None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.is_new || self.is_edit
    }

    pub fn has_dirty_rows(&self) -> bool {
        self.rows.iter().any(OverrideDetailRow::is_dirty)
    }

    /// (kind, value) pairs of all committed-or-pending rows
    pub fn values(&self) -> Vec<OverrideValue> {
        self.rows.iter().filter_map(|row| row.value.clone()).collect()
    }
}
