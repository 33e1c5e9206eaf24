use crate::error::{FieldError, OverrideError};
use crate::logic::state::OverrideContext;
use crate::model::{
    CreateOverrideRequest, OverrideDetailRow, OverrideRecord, OverrideScope, OverrideSpec,
    OverrideValue,
};

/// Rebuilds a whole `spec` map from the full row list of a section, one
/// array per kind in row order. Never a partial patch.
pub fn spec_from_rows(rows: &[OverrideDetailRow]) -> Result<OverrideSpec, OverrideError> {
    let mut spec = OverrideSpec::default();
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let field = format!("rows[{}]", index);
        match &row.value {
            None => errors.push(FieldError::new(
                field,
                format!("select an override type for row {}", index + 1),
            )),
            Some(OverrideValue::Variable(variable)) => spec.variables.push(variable.clone()),
            Some(OverrideValue::Manifest(manifest)) => spec.manifests.push(manifest.clone()),
            Some(OverrideValue::ConfigFile(file)) => spec.config_files.push(file.clone()),
            Some(OverrideValue::ApplicationSettings(settings)) => {
                if spec.application_settings.is_some() {
                    errors.push(duplicate_single(field, row));
                } else {
                    spec.application_settings = Some(settings.clone());
                }
            }
            Some(OverrideValue::ConnectionStrings(strings)) => {
                if spec.connection_strings.is_some() {
                    errors.push(duplicate_single(field, row));
                } else {
                    spec.connection_strings = Some(strings.clone());
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(spec)
    } else {
        Err(OverrideError::Validation { errors })
    }
}

fn duplicate_single(field: String, row: &OverrideDetailRow) -> FieldError {
    let kind = row
        .kind()
        .map(|k| k.spec_key())
        .unwrap_or("override");
    FieldError::new(field, format!("only one {} override is allowed", kind))
}

/// `{type, ...scope, orgIdentifier, projectIdentifier, spec}`
pub fn create_request(
    context: &OverrideContext,
    scope: &OverrideScope,
    spec: OverrideSpec,
) -> CreateOverrideRequest {
    CreateOverrideRequest {
        override_type: context.override_type(),
        scope: scope.clone(),
        org_identifier: context.project.org_identifier.clone(),
        project_identifier: context.project.project_identifier.clone(),
        spec,
    }
}

/// The prior record with its spec replaced wholesale
pub fn update_record(prior: &OverrideRecord, spec: OverrideSpec) -> OverrideRecord {
    OverrideRecord {
        spec,
        ..prior.clone()
    }
}
