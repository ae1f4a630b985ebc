use super::change::{applied, ViewStateChange};
use super::params::SearchParams;
use super::search::{FilterOption, QueryResult};
use super::table::POD_NODE_TYPE;
use super::view_state::{
    applied_filter_count, applied_filters, FilterFamily, KubernetesStatus, ViewState,
    PAGE_SIZE_OPTIONS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelVisibility {
    #[default]
    Collapsed,
    Expanded,
}

impl PanelVisibility {
    pub fn toggle(self) -> Self {
        match self {
            PanelVisibility::Collapsed => PanelVisibility::Expanded,
            PanelVisibility::Expanded => PanelVisibility::Collapsed,
        }
    }

    pub fn is_expanded(self) -> bool {
        self == PanelVisibility::Expanded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Pod,
}

impl NodeType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            POD_NODE_TYPE => Some(NodeType::Pod),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Pod => POD_NODE_TYPE,
        }
    }
}

/// Row selected for the detail overlay. Lives in the request path, never in
/// the query parameters, so opening and dismissing it leaves them intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedNode {
    pub node_id: String,
    pub node_type: NodeType,
}

#[derive(Debug, Clone)]
pub struct BadgeView {
    pub text: String,
    pub remove_href: String,
}

pub fn build_badges(params: &SearchParams) -> Vec<BadgeView> {
    applied_filters(params)
        .into_iter()
        .map(|(family, value)| {
            let change = ViewStateChange::RemoveFilterValue {
                family,
                value: value.clone(),
            };
            BadgeView {
                text: format!("{}: {}", family.label(), value),
                remove_href: applied(params, &change).href("/ui/pods"),
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FilterSummaryView {
    pub count: usize,
    pub badges: Vec<BadgeView>,
    pub clear_all_href: String,
}

pub fn build_filter_summary(params: &SearchParams) -> FilterSummaryView {
    FilterSummaryView {
        count: applied_filter_count(params),
        badges: build_badges(params),
        clear_all_href: applied(params, &ViewStateChange::ClearAllFilters).href("/ui/pods"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn build_option_views(options: &[FilterOption], selected: &[String]) -> Vec<OptionView> {
    let mut views: Vec<OptionView> = options
        .iter()
        .map(|o| OptionView {
            value: o.value.clone(),
            label: o.label.clone(),
            selected: selected.contains(&o.value),
        })
        .collect();
    for value in selected {
        if !options.iter().any(|o| &o.value == value) {
            views.push(OptionView {
                value: value.clone(),
                label: value.clone(),
                selected: true,
            });
        }
    }
    views
}

pub fn status_option_views(query: &str, current: Option<KubernetesStatus>) -> Vec<OptionView> {
    KubernetesStatus::narrow(query)
        .into_iter()
        .map(|st| OptionView {
            value: st.as_str().to_string(),
            label: st.as_str().to_string(),
            selected: current == Some(st),
        })
        .collect()
}

/// GET form that narrows one editor's option list. Every other current
/// parameter is resubmitted as a hidden field.
#[derive(Debug, Clone)]
pub struct SearchBoxView {
    pub name: &'static str,
    pub value: String,
    pub carry: Vec<(String, String)>,
}

pub fn build_search_box(params: &SearchParams, family: FilterFamily) -> SearchBoxView {
    let name = family.search_param();
    SearchBoxView {
        name,
        value: family.search_text(params).to_string(),
        carry: params
            .iter()
            .filter(|(k, _)| *k != name)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// Expanded while any editor has search text, so the narrowed list is
/// visible after the search submits.
pub fn panel_visibility(params: &SearchParams) -> PanelVisibility {
    let collapsed = PanelVisibility::default();
    if FilterFamily::ALL
        .into_iter()
        .any(|f| !f.search_text(params).is_empty())
    {
        collapsed.toggle()
    } else {
        collapsed
    }
}

#[derive(Debug, Clone)]
pub struct PageLink {
    pub label: String,
    pub href: String,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct PaginationView {
    pub summary: String,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLink>,
    pub sizes: Vec<OptionView>,
}

const PAGE_WINDOW: u32 = 2;

/// Pager for approximate pagination: `total_rows` is a look-ahead count, so
/// the last page is an estimate that grows as the user moves forward.
pub fn build_pagination(
    result: &QueryResult,
    vs: &ViewState,
    params: &SearchParams,
) -> PaginationView {
    let size = u64::from(vs.page_size.max(1));
    let current = result.current_page;
    let total_pages = result.total_rows.div_ceil(size).max(1);
    let last = u32::try_from(total_pages - 1).unwrap_or(u32::MAX).max(current);

    let href = |page: u32| applied(params, &ViewStateChange::SetPage(page)).href("/ui/pods");

    let first_in_window = current.saturating_sub(PAGE_WINDOW);
    let last_in_window = current.saturating_add(PAGE_WINDOW).min(last);
    let pages = (first_in_window..=last_in_window)
        .map(|page| PageLink {
            label: (u64::from(page) + 1).to_string(),
            href: href(page),
            current: page == current,
        })
        .collect();

    let start = u64::from(current) * size;
    let summary = if result.pods.is_empty() {
        "0 rows".to_string()
    } else {
        format!(
            "Showing {}-{} of {}",
            start + 1,
            start + result.pods.len() as u64,
            result.total_rows.max(start + result.pods.len() as u64)
        )
    };

    let mut sizes: Vec<u32> = PAGE_SIZE_OPTIONS.to_vec();
    if !sizes.contains(&vs.page_size) {
        sizes.push(vs.page_size);
        sizes.sort_unstable();
    }

    PaginationView {
        summary,
        prev_href: (current > 0).then(|| href(current - 1)),
        next_href: (current < last).then(|| href(current + 1)),
        pages,
        sizes: sizes
            .into_iter()
            .map(|s| OptionView {
                value: s.to_string(),
                label: s.to_string(),
                selected: s == vs.page_size,
            })
            .collect(),
    }
}
