use log::{error, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::error::OverrideError;
use crate::logic::list_store::OverrideListStore;
use crate::logic::permission::{AllowAll, PermissionGate};
use crate::logic::session::EditSession;
use crate::model::{OverrideQuery, OverrideType, ProjectScope};

/// Project and list query the override page is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideContext {
    pub project: ProjectScope,
    pub query: OverrideQuery,
}

impl OverrideContext {
    pub fn new(project: ProjectScope, query: OverrideQuery) -> Self {
        Self { project, query }
    }

    pub fn override_type(&self) -> OverrideType {
        self.query.override_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Toast-style message for the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything one override page owns: the list, the edit session and pending
/// notices. Every command takes it by `&mut`.
pub struct OverrideState {
    pub context: OverrideContext,
    pub list: OverrideListStore,
    pub session: EditSession,
    notices: Vec<Notice>,
    permissions: Arc<dyn PermissionGate>,
}

impl OverrideState {
    pub fn new(context: OverrideContext) -> Self {
        Self {
            context,
            list: OverrideListStore::new(),
            session: EditSession::new(),
            notices: Vec::new(),
            permissions: Arc::new(AllowAll),
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionGate>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn can_edit(&self) -> bool {
        self.permissions
            .can_edit(self.context.override_type().resource_type())
    }

    pub(crate) fn ensure_can_edit(&self) -> Result<(), OverrideError> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(OverrideError::PermissionDenied(
                self.context.override_type().resource_type(),
            ))
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Surfaces a command failure as a notice and hands the error back
    pub(crate) fn report(&mut self, err: OverrideError) -> OverrideError {
        if err.is_warning() {
            warn!("{}", err);
            self.notify(NoticeLevel::Warning, err.user_message());
        } else {
            error!("override command failed: {}", err);
            self.notify(NoticeLevel::Error, err.user_message());
        }
        err
    }

    /// Runs a synchronous command, reporting its failure
    pub(crate) fn run<T>(
        &mut self,
        command: impl FnOnce(&mut Self) -> Result<T, OverrideError>,
    ) -> Result<T, OverrideError> {
        let result = command(self);
        result.map_err(|err| self.report(err))
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Number of sections flagged new or edit; never more than one
    pub fn editing_sections(&self) -> usize {
        self.list.view_models().filter(|s| s.is_editing()).count()
    }
}
