use crate::error::OverrideError;
use crate::logic::edit_lock::EditLock;
use crate::model::{OverrideScope, SectionRef};

/// Transient handle of the section currently being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSection {
    pub section: SectionRef,
    /// Rows removed since the lock was taken; they only persist on save
    pub rows_deleted: usize,
    /// Row whose field editor is open
    pub editing_row: Option<usize>,
}

impl ActiveSection {
    fn new(section: SectionRef) -> Self {
        Self {
            section,
            rows_deleted: 0,
            editing_row: None,
        }
    }

    /// Keeps the open row pointing at the same row after `row` is removed
    pub(crate) fn row_removed(&mut self, row: usize) {
        self.editing_row = match self.editing_row {
            Some(open) if open == row => None,
            Some(open) if open > row => Some(open - 1),
            other => other,
        };
    }
}

/// The edit lock together with every handle tied to the locked section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    lock: EditLock,
    active: Option<ActiveSection>,
    selector: Option<OverrideScope>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> &EditLock {
        &self.lock
    }

    pub fn holder(&self) -> Option<SectionRef> {
        self.lock.holder()
    }

    pub fn acquire(&mut self, section: SectionRef) -> Result<(), OverrideError> {
        self.lock.acquire(section)?;
        if self.active.as_ref().map(|a| a.section) != Some(section) {
            self.active = Some(ActiveSection::new(section));
        }
        Ok(())
    }

    /// Clears the lock, the active-section handle and the scope selector
    pub fn release(&mut self) {
        self.lock.release();
        self.active = None;
        self.selector = None;
    }

    pub fn active_section(&self) -> Option<&ActiveSection> {
        self.active.as_ref()
    }

    pub(crate) fn active_section_mut(&mut self) -> Option<&mut ActiveSection> {
        self.active.as_mut()
    }

    /// Scope currently picked in the new-section selector
    pub fn selector(&self) -> Option<&OverrideScope> {
        self.selector.as_ref()
    }

    pub(crate) fn set_selector(&mut self, scope: OverrideScope) {
        self.selector = Some(scope);
    }

    pub fn rows_deleted(&self, section: SectionRef) -> usize {
        self.active
            .as_ref()
            .filter(|a| a.section == section)
            .map_or(0, |a| a.rows_deleted)
    }
}
