use crate::error::{FieldError, OverrideError};
use crate::model::{GitCoordinates, GitSaveChoices, OverrideScope, OverrideType};

/// Every scope field the override type requires must be filled in
pub fn validate_scope(override_type: OverrideType, scope: &OverrideScope) -> Result<(), OverrideError> {
    let errors: Vec<FieldError> = scope
        .missing_fields(override_type)
        .into_iter()
        .map(FieldError::missing_scope)
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(OverrideError::Validation { errors })
    }
}

pub fn validate_git_coordinates(coordinates: &GitCoordinates) -> Result<(), OverrideError> {
    let missing = coordinates.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(OverrideError::GitDetailsIncomplete { missing })
    }
}

pub fn validate_git_choices(choices: &GitSaveChoices) -> Result<(), OverrideError> {
    let missing = choices.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(OverrideError::GitDetailsIncomplete { missing })
    }
}
