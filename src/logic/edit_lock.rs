use log::debug;

use crate::error::OverrideError;
use crate::model::SectionRef;

/// Single-slot exclusivity guard: at most one section is editable at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditLock {
    holder: Option<SectionRef>,
}

impl EditLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self) -> Option<SectionRef> {
        self.holder
    }

    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    pub fn is_held_by(&self, section: SectionRef) -> bool {
        self.holder == Some(section)
    }

    /// Takes the lock for `requested`. Re-acquiring by the holder is a no-op;
    /// any other holder rejects the request without touching state.
    pub fn acquire(&mut self, requested: SectionRef) -> Result<(), OverrideError> {
        match self.holder {
            None => {
                debug!("edit lock acquired by {}", requested);
                self.holder = Some(requested);
                Ok(())
            }
            Some(held) if held == requested => Ok(()),
            Some(held) => Err(OverrideError::ExclusivityViolation { held, requested }),
        }
    }

    pub fn release(&mut self) -> Option<SectionRef> {
        let released = self.holder.take();
        if let Some(section) = released {
            debug!("edit lock released by {}", section);
        }
        released
    }
}
