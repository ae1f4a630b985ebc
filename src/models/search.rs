use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::view_state::{KubernetesStatus, ViewState};

// --- Records returned by the search backend ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PodRecord {
    #[serde(default)]
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub pods: Vec<PodRecord>,
    pub total_rows: u64,
    pub current_page: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

// --- Request derived from the view state ---

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchOrder {
    pub sort_by: String,
    pub descending: bool,
}

/// Everything the backend needs for one page. Its JSON form is the cache key.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PodSearchRequest {
    pub page: u32,
    pub page_size: u32,
    pub order: Option<SearchOrder>,
    pub hosts: Vec<String>,
    pub clusters: Vec<String>,
    pub kubernetes_status: Option<KubernetesStatus>,
}

impl PodSearchRequest {
    pub fn from_view_state(vs: &ViewState) -> Self {
        Self {
            page: vs.page,
            page_size: vs.page_size,
            order: vs.sort.as_ref().map(|s| SearchOrder {
                sort_by: s.column.clone(),
                descending: s.descending,
            }),
            hosts: vs.hosts.clone(),
            clusters: vs.clusters.clone(),
            kubernetes_status: vs.kubernetes_status,
        }
    }

    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    pub fn to_search_body(&self) -> SearchNodeReq {
        SearchNodeReq {
            node_filter: self.node_filter(),
            window: Window {
                offset: self.offset(),
                size: u64::from(self.page_size),
            },
        }
    }

    /// Body for `/search/count/pods`. The window looks ten pages ahead so the
    /// pager can show approximate totals without a full count.
    pub fn to_count_body(&self) -> SearchNodeReq {
        SearchNodeReq {
            node_filter: self.node_filter(),
            window: Window {
                offset: self.offset(),
                size: u64::from(self.page_size) * 10,
            },
        }
    }

    fn node_filter(&self) -> NodeFilter {
        let mut filters = FieldFilters::default();
        filters.contains.insert("active".to_string(), json!([true]));
        if !self.hosts.is_empty() {
            filters.contains.insert("host_name".to_string(), json!(self.hosts));
        }
        if !self.clusters.is_empty() {
            filters
                .contains
                .insert("kubernetes_cluster_name".to_string(), json!(self.clusters));
        }
        match self.kubernetes_status {
            Some(KubernetesStatus::Running) => {
                filters
                    .contains
                    .insert("kubernetes_state".to_string(), json!(["Running"]));
            }
            Some(KubernetesStatus::NotRunning) => {
                filters
                    .not_contains
                    .insert("kubernetes_state".to_string(), json!(["Running"]));
            }
            None => {}
        }
        if let Some(ref order) = self.order {
            filters.order_fields.push(OrderField {
                field_name: order.sort_by.clone(),
                descending: order.descending,
            });
        }
        NodeFilter::from(filters)
    }
}

// --- Backend wire format ---

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchNodeReq {
    pub node_filter: NodeFilter,
    pub window: Window,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeFilter {
    pub filters: Filters,
    pub in_field_filter: Option<Vec<String>>,
    pub window: Window,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Filters {
    pub compare_filter: Option<Value>,
    pub contains_filter: FilterIn,
    pub not_contains_filter: FilterIn,
    pub match_filter: FilterIn,
    pub order_filter: OrderFilter,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct FilterIn {
    pub filter_in: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct OrderFilter {
    pub order_fields: Vec<OrderField>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderField {
    pub field_name: String,
    pub descending: bool,
}

#[derive(Debug, Default)]
pub struct FieldFilters {
    pub contains: Map<String, Value>,
    pub not_contains: Map<String, Value>,
    pub matches: Map<String, Value>,
    pub order_fields: Vec<OrderField>,
}

impl From<FieldFilters> for NodeFilter {
    fn from(f: FieldFilters) -> Self {
        NodeFilter {
            filters: Filters {
                compare_filter: None,
                contains_filter: FilterIn { filter_in: f.contains },
                not_contains_filter: FilterIn {
                    filter_in: f.not_contains,
                },
                match_filter: FilterIn { filter_in: f.matches },
                order_filter: OrderFilter {
                    order_fields: f.order_fields,
                },
            },
            in_field_filter: None,
            window: Window { offset: 0, size: 0 },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCountResp {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostRecord {
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub node_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRecord {
    #[serde(default)]
    pub node_name: String,
}
