use log::debug;
use std::collections::HashSet;

use crate::error::OverrideError;
use crate::model::{OverridePage, OverrideRecord, PageInfo, SectionRef, SectionViewModel};

/// Section view-models of the last successfully loaded page, plus the
/// new-section placeholder while one is open
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideListStore {
    sections: Vec<SectionViewModel>,
    placeholder: Option<SectionViewModel>,
    page: Option<PageInfo>,
}

impl OverrideListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole list with projections of `page.content`, in server
    /// order. A malformed page leaves the previous list untouched.
    pub fn load(&mut self, page: &OverridePage) -> Result<(), OverrideError> {
        let mut seen = HashSet::new();
        for record in &page.content {
            if record.identifier.trim().is_empty() {
                return Err(OverrideError::ReconciliationFailure(
                    "override record without identifier".to_string(),
                ));
            }
            if !seen.insert(record.identifier.as_str()) {
                return Err(OverrideError::ReconciliationFailure(format!(
                    "override '{}' listed twice",
                    record.identifier
                )));
            }
        }

        self.sections = page
            .content
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, record)| SectionViewModel::from_record(index, record))
            .collect();
        self.placeholder = None;
        self.page = Some(page.info);
        debug!("loaded {} override sections", self.sections.len());
        Ok(())
    }

    /// Replaces only the view-model at `index`; every other slot keeps its
    /// position and content.
    pub fn rebuild_slot(&mut self, index: usize, record: OverrideRecord) -> Result<(), OverrideError> {
        let slot = self.sections.get_mut(index).ok_or_else(|| {
            OverrideError::ReconciliationFailure(format!("no section at index {}", index))
        })?;

        if let Some(current) = &slot.record {
            if current.identifier != record.identifier {
                return Err(OverrideError::ReconciliationFailure(format!(
                    "expected override '{}' but server returned '{}'",
                    current.identifier, record.identifier
                )));
            }
        }

        *slot = SectionViewModel::from_record(index, record);
        Ok(())
    }

    pub fn sections(&self) -> &[SectionViewModel] {
        &self.sections
    }

    pub fn placeholder(&self) -> Option<&SectionViewModel> {
        self.placeholder.as_ref()
    }

    pub fn page_info(&self) -> Option<PageInfo> {
        self.page
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, section: SectionRef) -> Option<&SectionViewModel> {
        match section {
            SectionRef::New => self.placeholder.as_ref(),
            SectionRef::Existing(index) => self.sections.get(index),
        }
    }

    pub(crate) fn section_mut(&mut self, section: SectionRef) -> Option<&mut SectionViewModel> {
        match section {
            SectionRef::New => self.placeholder.as_mut(),
            SectionRef::Existing(index) => self.sections.get_mut(index),
        }
    }

    /// Rendering order: the placeholder first, then the loaded page
    pub fn view_models(&self) -> impl Iterator<Item = &SectionViewModel> {
        self.placeholder.iter().chain(self.sections.iter())
    }

    pub(crate) fn open_placeholder(&mut self, placeholder: SectionViewModel) {
        self.placeholder = Some(placeholder);
    }

    pub(crate) fn remove_placeholder(&mut self) -> Option<SectionViewModel> {
        self.placeholder.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OverrideScope, OverrideSpec, OverrideType, StoreType, Variable};

    fn record(identifier: &str, env: &str, vars: &[(&str, &str)]) -> OverrideRecord {
        OverrideRecord {
            identifier: identifier.to_string(),
            account_id: "acc".to_string(),
            org_identifier: Some("org".to_string()),
            project_identifier: Some("proj".to_string()),
            scope: OverrideScope::environment(env),
            override_type: OverrideType::EnvGlobal,
            spec: OverrideSpec {
                variables: vars.iter().map(|(n, v)| Variable::string(n, v)).collect(),
                ..Default::default()
            },
            store_type: StoreType::Inline,
            connector_ref: None,
            entity_git_details: None,
            created_at: None,
            last_modified_at: None,
        }
    }

    fn page(records: Vec<OverrideRecord>) -> OverridePage {
        let size = records.len().max(1);
        OverridePage::slice(records, 0, size)
    }

    #[test]
    fn test_load_assigns_positions_in_server_order() {
        let mut store = OverrideListStore::new();
        store
            .load(&page(vec![
                record("qa", "qa", &[("a", "1")]),
                record("dev", "dev", &[("b", "2"), ("c", "3")]),
            ]))
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.sections()[0].group_key, "qa/-/-");
        assert_eq!(store.sections()[1].section, SectionRef::Existing(1));
        assert_eq!(store.sections()[1].rows.len(), 2);
        assert_eq!(store.page_info().unwrap().total_elements, 2);
    }

    #[test]
    fn test_load_discards_placeholder() {
        let mut store = OverrideListStore::new();
        store.open_placeholder(SectionViewModel::placeholder(OverrideScope::default()));
        store.load(&page(vec![record("qa", "qa", &[])])).unwrap();
        assert!(store.placeholder().is_none());
        assert_eq!(store.view_models().count(), 1);
    }

    #[test]
    fn test_malformed_page_keeps_last_good_list() {
        let mut store = OverrideListStore::new();
        store.load(&page(vec![record("qa", "qa", &[("a", "1")])])).unwrap();
        let before = store.clone();

        let err = store
            .load(&page(vec![record("dev", "dev", &[]), record("dev", "dev", &[])]))
            .unwrap_err();
        assert!(matches!(err, OverrideError::ReconciliationFailure(_)));
        assert_eq!(store, before);

        assert!(store.load(&page(vec![record("", "dev", &[])])).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_rebuild_slot_touches_one_slot() {
        let mut store = OverrideListStore::new();
        store
            .load(&page(vec![
                record("qa", "qa", &[("a", "1")]),
                record("dev", "dev", &[("b", "2")]),
                record("prod", "prod", &[("c", "3")]),
            ]))
            .unwrap();
        let untouched = (store.sections()[0].clone(), store.sections()[2].clone());

        store
            .rebuild_slot(1, record("dev", "dev", &[("b", "20"), ("d", "4")]))
            .unwrap();

        assert_eq!(store.sections()[1].rows.len(), 2);
        assert_eq!(store.sections()[1].section, SectionRef::Existing(1));
        assert_eq!(store.sections()[0], untouched.0);
        assert_eq!(store.sections()[2], untouched.1);
    }

    #[test]
    fn test_rebuild_slot_rejects_other_record() {
        let mut store = OverrideListStore::new();
        store.load(&page(vec![record("qa", "qa", &[])])).unwrap();
        let before = store.clone();

        assert!(store.rebuild_slot(0, record("prod", "prod", &[])).is_err());
        assert!(store.rebuild_slot(4, record("qa", "qa", &[])).is_err());
        assert_eq!(store, before);
    }
}
