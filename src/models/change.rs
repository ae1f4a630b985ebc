use super::params::SearchParams;
use super::view_state::{
    FilterFamily, KubernetesStatus, SortSpec, PARAM_DESC, PARAM_KUBERNETES_STATUS, PARAM_PAGE,
    PARAM_SIZE, PARAM_SORT_BY,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStateChange {
    SetKubernetesStatus(Option<KubernetesStatus>),
    ReplaceFilter {
        family: FilterFamily,
        values: Vec<String>,
    },
    ClearFilter(FilterFamily),
    RemoveFilterValue {
        family: FilterFamily,
        value: String,
    },
    ClearAllFilters,
    SetPage(u32),
    SetPageSize(u32),
    SetSort(Option<SortSpec>),
}

impl ViewStateChange {
    // Sort changes and page navigation keep `page`; every other change clears it.
    fn resets_page(&self) -> bool {
        !matches!(self, ViewStateChange::SetPage(_) | ViewStateChange::SetSort(_))
    }
}

pub fn apply(params: &mut SearchParams, change: &ViewStateChange) {
    match change {
        ViewStateChange::SetKubernetesStatus(status) => match status {
            Some(st) => params.set(PARAM_KUBERNETES_STATUS, st.as_str()),
            None => params.delete(PARAM_KUBERNETES_STATUS),
        },
        ViewStateChange::ReplaceFilter { family, values } => {
            params.delete(family.param());
            for value in values {
                params.append(family.param(), value.clone());
            }
        }
        ViewStateChange::ClearFilter(family) => params.delete(family.param()),
        ViewStateChange::RemoveFilterValue { family, value } => {
            let key = family.param();
            let remaining: Vec<String> = params
                .get_all(key)
                .into_iter()
                .filter(|v| *v != value.as_str())
                .map(str::to_string)
                .collect();
            params.delete(key);
            for v in remaining {
                params.append(key, v);
            }
        }
        ViewStateChange::ClearAllFilters => {
            for family in FilterFamily::ALL {
                params.delete(family.param());
            }
        }
        ViewStateChange::SetPage(page) => params.set(PARAM_PAGE, page.to_string()),
        ViewStateChange::SetPageSize(size) => params.set(PARAM_SIZE, size.to_string()),
        ViewStateChange::SetSort(sort) => match sort {
            Some(s) => {
                params.set(PARAM_SORT_BY, s.column.clone());
                params.set(PARAM_DESC, s.descending.to_string());
            }
            None => {
                params.delete(PARAM_SORT_BY);
                params.delete(PARAM_DESC);
            }
        },
    }

    if change.resets_page() {
        params.delete(PARAM_PAGE);
    }
}

pub fn applied(params: &SearchParams, change: &ViewStateChange) -> SearchParams {
    let mut next = params.clone();
    apply(&mut next, change);
    next
}

/// Next sort state when a column header is clicked:
/// none → ascending → descending → none.
pub fn next_sort(current: Option<&SortSpec>, column: &str) -> Option<SortSpec> {
    match current {
        Some(s) if s.column == column && !s.descending => Some(SortSpec {
            column: column.to_string(),
            descending: true,
        }),
        Some(s) if s.column == column => None,
        _ => Some(SortSpec {
            column: column.to_string(),
            descending: false,
        }),
    }
}
