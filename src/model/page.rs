use serde::{Deserialize, Serialize};

use crate::model::{OverrideRecord, OverrideType};

/// List filter; an empty list means no restriction on that field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideFilter {
    #[serde(default)]
    pub service_refs: Vec<String>,
    #[serde(default)]
    pub environment_refs: Vec<String>,
    #[serde(default)]
    pub infra_identifiers: Vec<String>,
}

impl OverrideFilter {
    pub fn matches(&self, record: &OverrideRecord) -> bool {
        fn allowed(values: &[String], candidate: Option<&str>) -> bool {
            values.is_empty() || candidate.map_or(false, |c| values.iter().any(|v| v == c))
        }

        allowed(&self.service_refs, record.scope.service_ref.as_deref())
            && allowed(&self.environment_refs, record.scope.environment_ref.as_deref())
            && allowed(&self.infra_identifiers, record.scope.infra_identifier.as_deref())
    }
}

/// One list request: a fixed override type, a filter and a page window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideQuery {
    pub override_type: OverrideType,
    pub filter: OverrideFilter,
    pub page: usize,
    pub size: usize,
}

impl OverrideQuery {
    pub fn new(override_type: OverrideType, size: usize) -> Self {
        Self {
            override_type,
            filter: OverrideFilter::default(),
            page: 0,
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub size: usize,
    pub total_pages: usize,
    pub total_elements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridePage {
    pub content: Vec<OverrideRecord>,
    #[serde(flatten)]
    pub info: PageInfo,
}

impl OverridePage {
    /// Cuts page `page` of `size` out of the full ordered result
    pub fn slice(records: Vec<OverrideRecord>, page: usize, size: usize) -> Self {
        let total_elements = records.len();
        let total_pages = if size == 0 {
            0
        } else {
            (total_elements + size - 1) / size
        };
        let content = records
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();

        Self {
            content,
            info: PageInfo {
                page,
                size,
                total_pages,
                total_elements,
            },
        }
    }
}
