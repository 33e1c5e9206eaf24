use log::debug;

use crate::error::OverrideError;
use crate::logic::sections::SectionEditor;
use crate::logic::state::OverrideState;
use crate::model::{OverrideDetailRow, OverrideValue, SectionRef, SectionViewModel};

/// What a discard-row request knows about the row being discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscardRowMeta {
    pub is_new: bool,
    pub is_clone: bool,
    pub is_edit: bool,
    pub row_index: usize,
    /// Rows were deleted from the section since its lock was taken
    pub any_rows_deleted: bool,
}

impl DiscardRowMeta {
    /// Reads the row flags and the session's deletion counter
    pub fn for_row(
        state: &OverrideState,
        section: SectionRef,
        row_index: usize,
    ) -> Result<Self, OverrideError> {
        let row = row_at(state, section, row_index)?;
        Ok(Self {
            is_new: row.is_new,
            is_clone: row.is_clone,
            is_edit: row.is_edit,
            row_index,
            any_rows_deleted: state.session.rows_deleted(section) > 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardOutcome {
    /// Only the row was reverted; the section stays in edit
    RowReverted,
    /// Nothing was left pending, so the whole section was discarded
    SectionReverted,
}

fn section_at(state: &OverrideState, section: SectionRef) -> Result<&SectionViewModel, OverrideError> {
    state
        .list
        .section(section)
        .ok_or(OverrideError::SectionNotFound(section))
}

fn row_at(
    state: &OverrideState,
    section: SectionRef,
    row: usize,
) -> Result<&OverrideDetailRow, OverrideError> {
    section_at(state, section)?
        .rows
        .get(row)
        .ok_or(OverrideError::RowNotFound { section, row })
}

fn rows_mut(
    state: &mut OverrideState,
    section: SectionRef,
) -> Result<&mut Vec<OverrideDetailRow>, OverrideError> {
    state
        .list
        .section_mut(section)
        .map(|vm| &mut vm.rows)
        .ok_or(OverrideError::SectionNotFound(section))
}

/// Row-level commands. Every mutation runs under the section's edit lock and
/// stays local until the section is saved.
pub struct RowEditor;

impl RowEditor {
    /// Permission and lock; flags an existing section as being edited
    fn begin(state: &mut OverrideState, section: SectionRef) -> Result<(), OverrideError> {
        state.ensure_can_edit()?;
        section_at(state, section)?;
        state.session.acquire(section)?;
        if let Some(vm) = state.list.section_mut(section) {
            if !vm.is_new {
                vm.is_edit = true;
            }
        }
        Ok(())
    }

    /// Appends a blank row; returns its index
    pub fn add_row(state: &mut OverrideState, section: SectionRef) -> Result<usize, OverrideError> {
        state.run(|state| {
            Self::begin(state, section)?;
            let rows = rows_mut(state, section)?;
            rows.push(OverrideDetailRow::blank());
            debug!("added row {} to {}", rows.len() - 1, section);
            Ok(rows.len() - 1)
        })
    }

    /// Inserts a copy of `row` right after it; returns the copy's index
    pub fn clone_row(
        state: &mut OverrideState,
        row: usize,
        section: SectionRef,
    ) -> Result<usize, OverrideError> {
        state.run(|state| {
            row_at(state, section, row)?;
            Self::begin(state, section)?;

            let rows = rows_mut(state, section)?;
            let source = &rows[row];
            let copy = OverrideDetailRow {
                value: source.value.clone(),
                is_new: false,
                is_edit: true,
                is_clone: true,
                is_expanded: source.is_expanded,
            };
            rows.insert(row + 1, copy);
            Ok(row + 1)
        })
    }

    pub fn edit_row(
        state: &mut OverrideState,
        row: usize,
        section: SectionRef,
    ) -> Result<(), OverrideError> {
        state.run(|state| {
            row_at(state, section, row)?;
            Self::begin(state, section)?;

            rows_mut(state, section)?[row].is_edit = true;
            if let Some(active) = state.session.active_section_mut() {
                active.editing_row = Some(row);
            }
            Ok(())
        })
    }

    /// Drops the row from the in-memory list only; nothing is sent until the
    /// section is saved
    pub fn delete_row(
        state: &mut OverrideState,
        row: usize,
        section: SectionRef,
    ) -> Result<(), OverrideError> {
        state.run(|state| {
            row_at(state, section, row)?;
            Self::begin(state, section)?;

            rows_mut(state, section)?.remove(row);
            if let Some(active) = state.session.active_section_mut() {
                active.rows_deleted += 1;
                active.row_removed(row);
            }
            debug!("deleted row {} of {}", row, section);
            Ok(())
        })
    }

    /// Field-editor hook: stores the value the editor produced for a row
    pub fn set_row_value(
        state: &mut OverrideState,
        section: SectionRef,
        row: usize,
        value: OverrideValue,
    ) -> Result<(), OverrideError> {
        state.run(|state| {
            row_at(state, section, row)?;
            Self::begin(state, section)?;

            let target = &mut rows_mut(state, section)?[row];
            target.value = Some(value);
            if !target.is_new && !target.is_clone {
                target.is_edit = true;
            }
            Ok(())
        })
    }

    /// Pure UI toggle; works whoever holds the lock
    pub fn toggle_expanded(
        state: &mut OverrideState,
        section: SectionRef,
        row: usize,
    ) -> Result<bool, OverrideError> {
        row_at(state, section, row)?;
        let target = &mut rows_mut(state, section)?[row];
        target.is_expanded = !target.is_expanded;
        Ok(target.is_expanded)
    }

    /// Reverts one row: new and cloned rows disappear, edited rows lose their
    /// edit flag. When nothing pending is left and no row was deleted, the
    /// whole section is discarded instead.
    pub fn discard_row(
        state: &mut OverrideState,
        section: SectionRef,
        meta: DiscardRowMeta,
    ) -> Result<DiscardOutcome, OverrideError> {
        state.run(|state| {
            row_at(state, section, meta.row_index)?;
            state.session.acquire(section)?;

            let rows = rows_mut(state, section)?;
            let removed = meta.is_new || meta.is_clone;
            if removed {
                rows.remove(meta.row_index);
            } else if meta.is_edit {
                rows[meta.row_index].is_edit = false;
            }
            let pending = rows.iter().any(OverrideDetailRow::is_dirty);

            if let Some(active) = state.session.active_section_mut() {
                if removed {
                    active.row_removed(meta.row_index);
                } else if active.editing_row == Some(meta.row_index) {
                    active.editing_row = None;
                }
            }

            if !pending && !meta.any_rows_deleted {
                SectionEditor::revert_section(state, section)?;
                return Ok(DiscardOutcome::SectionReverted);
            }
            Ok(DiscardOutcome::RowReverted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::state::OverrideContext;
    use crate::model::{
        OverridePage, OverrideQuery, OverrideRecord, OverrideScope, OverrideSpec, OverrideType,
        ProjectScope, StoreType, Variable,
    };

    fn record(identifier: &str, vars: &[&str]) -> OverrideRecord {
        OverrideRecord {
            identifier: identifier.to_string(),
            account_id: "acc".to_string(),
            org_identifier: Some("org".to_string()),
            project_identifier: Some("proj".to_string()),
            scope: OverrideScope::environment(identifier),
            override_type: OverrideType::EnvGlobal,
            spec: OverrideSpec {
                variables: vars.iter().map(|v| Variable::string(v, v)).collect(),
                ..Default::default()
            },
            store_type: StoreType::Inline,
            connector_ref: None,
            entity_git_details: None,
            created_at: None,
            last_modified_at: None,
        }
    }

    fn state_with(records: Vec<OverrideRecord>) -> OverrideState {
        let mut state = OverrideState::new(OverrideContext::new(
            ProjectScope::project("acc", "org", "proj"),
            OverrideQuery::new(OverrideType::EnvGlobal, 10),
        ));
        state
            .list
            .load(&OverridePage::slice(records, 0, 10))
            .unwrap();
        state
    }

    fn names(state: &OverrideState, section: SectionRef) -> Vec<String> {
        state
            .list
            .section(section)
            .unwrap()
            .rows
            .iter()
            .map(|row| match &row.value {
                Some(OverrideValue::Variable(v)) => v.name.clone(),
                Some(other) => format!("{:?}", other.kind()),
                None => "<blank>".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_clone_inserts_after_source() {
        let mut state = state_with(vec![record("qa", &["a", "b", "c", "d"])]);
        let s = SectionRef::Existing(0);
        let before = state.list.section(s).unwrap().rows.clone();

        let copy = RowEditor::clone_row(&mut state, 1, s).unwrap();
        assert_eq!(copy, 2);

        let rows = &state.list.section(s).unwrap().rows;
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].value, before[1].value);
        assert!(rows[2].is_clone && rows[2].is_edit && !rows[2].is_new);
        assert_eq!(rows[0], before[0]);
        assert_eq!(rows[1], before[1]);
        assert_eq!(rows[3], before[2]);
        assert_eq!(rows[4], before[3]);
        assert!(state.list.section(s).unwrap().is_edit);
    }

    #[test]
    fn test_discarding_clone_shifts_open_row() {
        let mut state = state_with(vec![record("qa", &["a", "b", "c"])]);
        let s = SectionRef::Existing(0);
        RowEditor::clone_row(&mut state, 0, s).unwrap();
        RowEditor::edit_row(&mut state, 2, s).unwrap();
        assert_eq!(names(&state, s), vec!["a", "a", "b", "c"]);

        let meta = DiscardRowMeta::for_row(&state, s, 1).unwrap();
        assert_eq!(
            RowEditor::discard_row(&mut state, s, meta).unwrap(),
            DiscardOutcome::RowReverted
        );
        assert_eq!(names(&state, s), vec!["a", "b", "c"]);
        let active = state.session.active_section().unwrap();
        assert_eq!(active.editing_row, Some(1));
        assert!(state.list.section(s).unwrap().rows[1].is_edit);
    }

    #[test]
    fn test_clone_last_row() {
        let mut state = state_with(vec![record("qa", &["a", "b"])]);
        RowEditor::clone_row(&mut state, 1, SectionRef::Existing(0)).unwrap();
        assert_eq!(names(&state, SectionRef::Existing(0)), vec!["a", "b", "b"]);
    }

    #[test]
    fn test_edit_row_in_place() {
        let mut state = state_with(vec![record("qa", &["a", "b"])]);
        let s = SectionRef::Existing(0);
        RowEditor::edit_row(&mut state, 1, s).unwrap();

        let section = state.list.section(s).unwrap();
        assert_eq!(section.rows.len(), 2);
        assert!(section.rows[1].is_edit);
        assert!(!section.rows[0].is_edit);
        assert_eq!(state.session.active_section().unwrap().editing_row, Some(1));
    }

    #[test]
    fn test_row_commands_respect_lock() {
        let mut state = state_with(vec![record("qa", &["a"]), record("dev", &["b"])]);
        RowEditor::add_row(&mut state, SectionRef::Existing(0)).unwrap();
        let list_before = state.list.clone();
        let session_before = state.session.clone();

        for result in [
            RowEditor::add_row(&mut state, SectionRef::Existing(1)).map(|_| ()),
            RowEditor::clone_row(&mut state, 0, SectionRef::Existing(1)).map(|_| ()),
            RowEditor::edit_row(&mut state, 0, SectionRef::Existing(1)),
            RowEditor::delete_row(&mut state, 0, SectionRef::Existing(1)),
        ] {
            assert!(matches!(
                result,
                Err(OverrideError::ExclusivityViolation { .. })
            ));
        }
        assert_eq!(state.list, list_before);
        assert_eq!(state.session, session_before);
        assert_eq!(state.editing_sections(), 1);
        assert_eq!(state.take_notices().len(), 4);
    }

    #[test]
    fn test_toggle_ignores_lock() {
        let mut state = state_with(vec![record("qa", &["a"]), record("dev", &["b"])]);
        RowEditor::edit_row(&mut state, 0, SectionRef::Existing(0)).unwrap();
        assert!(RowEditor::toggle_expanded(&mut state, SectionRef::Existing(1), 0).unwrap());
        assert!(!state.list.section(SectionRef::Existing(1)).unwrap().is_edit);
    }

    #[test]
    fn test_missing_row_does_not_take_lock() {
        let mut state = state_with(vec![record("qa", &["a"])]);
        let err = RowEditor::edit_row(&mut state, 5, SectionRef::Existing(0)).unwrap_err();
        assert_eq!(
            err,
            OverrideError::RowNotFound {
                section: SectionRef::Existing(0),
                row: 5
            }
        );
        assert!(!state.session.lock().is_held());
    }

    #[test]
    fn test_discard_clone_removes_it() {
        let mut state = state_with(vec![record("qa", &["a", "b"])]);
        let s = SectionRef::Existing(0);
        RowEditor::edit_row(&mut state, 0, s).unwrap();
        let copy = RowEditor::clone_row(&mut state, 1, s).unwrap();

        let meta = DiscardRowMeta::for_row(&state, s, copy).unwrap();
        assert_eq!(
            RowEditor::discard_row(&mut state, s, meta).unwrap(),
            DiscardOutcome::RowReverted
        );
        assert_eq!(names(&state, s), vec!["a", "b"]);
        assert!(state.session.lock().is_held_by(s));
    }

    #[test]
    fn test_discard_edited_row_keeps_count() {
        let mut state = state_with(vec![record("qa", &["a", "b"])]);
        let s = SectionRef::Existing(0);
        RowEditor::edit_row(&mut state, 0, s).unwrap();
        RowEditor::edit_row(&mut state, 1, s).unwrap();

        let meta = DiscardRowMeta::for_row(&state, s, 1).unwrap();
        RowEditor::discard_row(&mut state, s, meta).unwrap();
        let rows = &state.list.section(s).unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert!(!rows[1].is_edit);
        assert!(rows[0].is_edit);
    }

    #[test]
    fn test_discard_last_pending_row_reverts_section() {
        let mut state = state_with(vec![record("qa", &["a"])]);
        let s = SectionRef::Existing(0);
        let added = RowEditor::add_row(&mut state, s).unwrap();

        let meta = DiscardRowMeta::for_row(&state, s, added).unwrap();
        assert_eq!(
            RowEditor::discard_row(&mut state, s, meta).unwrap(),
            DiscardOutcome::SectionReverted
        );
        assert!(!state.session.lock().is_held());
        assert!(!state.list.section(s).unwrap().is_edit);
        assert_eq!(names(&state, s), vec!["a"]);
    }

    #[test]
    fn test_deletions_keep_section_in_edit() {
        let mut state = state_with(vec![record("qa", &["a", "b", "c"])]);
        let s = SectionRef::Existing(0);
        RowEditor::delete_row(&mut state, 0, s).unwrap();
        RowEditor::edit_row(&mut state, 0, s).unwrap();

        let meta = DiscardRowMeta::for_row(&state, s, 0).unwrap();
        assert!(meta.any_rows_deleted);
        assert_eq!(
            RowEditor::discard_row(&mut state, s, meta).unwrap(),
            DiscardOutcome::RowReverted
        );
        assert_eq!(names(&state, s), vec!["b", "c"]);
        assert!(state.session.lock().is_held_by(s));
    }

    #[test]
    fn test_set_value_marks_existing_row_edited() {
        let mut state = state_with(vec![record("qa", &["a"])]);
        let s = SectionRef::Existing(0);
        RowEditor::set_row_value(&mut state, s, 0, OverrideValue::variable("a", "changed")).unwrap();
        let added = RowEditor::add_row(&mut state, s).unwrap();
        RowEditor::set_row_value(&mut state, s, added, OverrideValue::variable("z", "1")).unwrap();

        let rows = &state.list.section(s).unwrap().rows;
        assert!(rows[0].is_edit);
        assert!(rows[1].is_new && !rows[1].is_edit);
        assert_eq!(rows[1].value, Some(OverrideValue::variable("z", "1")));
    }
}
