use crate::helpers::{path_segment, truncate};

use super::change::{applied, next_sort, ViewStateChange};
use super::params::SearchParams;
use super::search::{PodRecord, QueryResult};
use super::view_state::ViewState;

pub const NO_DATA_TEXT: &str = "No hosts are connected";
pub const POD_NODE_TYPE: &str = "pod";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    DetailLink,
    Text,
}

pub struct ColumnDef {
    pub id: &'static str,
    pub header: &'static str,
    pub accessor: fn(&PodRecord) -> Option<&str>,
    pub kind: CellKind,
    /// Shown when the value is missing; `None` means empty text.
    pub placeholder: Option<&'static str>,
    pub min_width: u32,
    pub width: u32,
    pub max_width: u32,
    pub max_chars: usize,
}

pub static POD_COLUMNS: [ColumnDef; 4] = [
    ColumnDef {
        id: "pod_name",
        header: "Pod Name",
        accessor: pod_name,
        kind: CellKind::DetailLink,
        placeholder: Some("-"),
        min_width: 130,
        width: 140,
        max_width: 145,
        max_chars: 40,
    },
    ColumnDef {
        id: "kubernetes_cluster_name",
        header: "Cluster Name",
        accessor: kubernetes_cluster_name,
        kind: CellKind::Text,
        placeholder: None,
        min_width: 80,
        width: 80,
        max_width: 90,
        max_chars: 24,
    },
    ColumnDef {
        id: "kubernetes_namespace",
        header: "Kubernetes Namespace",
        accessor: kubernetes_namespace,
        kind: CellKind::Text,
        placeholder: None,
        min_width: 100,
        width: 105,
        max_width: 110,
        max_chars: 30,
    },
    ColumnDef {
        id: "kubernetes_state",
        header: "Kubernetes State",
        accessor: kubernetes_state,
        kind: CellKind::Text,
        placeholder: None,
        min_width: 80,
        width: 80,
        max_width: 90,
        max_chars: 24,
    },
];

fn pod_name(p: &PodRecord) -> Option<&str> {
    p.pod_name.as_deref()
}

fn kubernetes_cluster_name(p: &PodRecord) -> Option<&str> {
    p.kubernetes_cluster_name.as_deref()
}

fn kubernetes_namespace(p: &PodRecord) -> Option<&str> {
    p.kubernetes_namespace.as_deref()
}

fn kubernetes_state(p: &PodRecord) -> Option<&str> {
    p.kubernetes_state.as_deref()
}

#[derive(Debug, Clone)]
pub struct CellView {
    pub text: String,
    pub title: String,
    pub href: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RowView {
    pub id: String,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone)]
pub struct HeaderView {
    pub label: String,
    pub href: String,
    pub indicator: &'static str,
    pub style: String,
}

pub fn detail_href(node_id: &str, params: &SearchParams) -> String {
    params.href(&format!(
        "/ui/pods/detail/{}/{}",
        POD_NODE_TYPE,
        path_segment(node_id)
    ))
}

fn build_cell(col: &ColumnDef, pod: &PodRecord, params: &SearchParams) -> CellView {
    let value = (col.accessor)(pod)
        .filter(|v| !v.is_empty())
        .or(col.placeholder)
        .unwrap_or_default();
    let text = truncate(value, col.max_chars);
    CellView {
        text,
        title: value.to_string(),
        href: match col.kind {
            CellKind::DetailLink => Some(detail_href(&pod.node_id, params)),
            CellKind::Text => None,
        },
    }
}

pub fn build_rows(result: &QueryResult, params: &SearchParams) -> Vec<RowView> {
    result
        .pods
        .iter()
        .map(|pod| RowView {
            id: pod.node_id.clone(),
            cells: POD_COLUMNS
                .iter()
                .map(|col| build_cell(col, pod, params))
                .collect(),
        })
        .collect()
}

pub fn build_headers(vs: &ViewState, params: &SearchParams) -> Vec<HeaderView> {
    POD_COLUMNS
        .iter()
        .map(|col| {
            let current = vs.sort.as_ref();
            let indicator = match current {
                Some(s) if s.column == col.id && s.descending => "▼",
                Some(s) if s.column == col.id => "▲",
                _ => "",
            };
            let change = ViewStateChange::SetSort(next_sort(current, col.id));
            HeaderView {
                label: col.header.to_string(),
                href: applied(params, &change).href("/ui/pods"),
                indicator,
                style: format!(
                    "min-width:{}px;width:{}px;max-width:{}px",
                    col.min_width, col.width, col.max_width
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(id: &str, name: Option<&str>) -> PodRecord {
        PodRecord {
            node_id: id.to_string(),
            pod_name: name.map(str::to_string),
            kubernetes_namespace: Some("default".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_column_order_is_fixed() {
        let ids: Vec<&str> = POD_COLUMNS.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                "pod_name",
                "kubernetes_cluster_name",
                "kubernetes_namespace",
                "kubernetes_state"
            ]
        );
    }

    #[test]
    fn test_missing_name_uses_placeholder_other_columns_empty() {
        let result = QueryResult {
            pods: vec![pod("p-1", None)],
            total_rows: 1,
            current_page: 0,
        };
        let rows = build_rows(&result, &SearchParams::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "p-1");
        assert_eq!(rows[0].cells[0].text, "-");
        assert_eq!(rows[0].cells[1].text, "");
        assert_eq!(rows[0].cells[2].text, "default");
        assert_eq!(rows[0].cells[3].text, "");
    }

    #[test]
    fn test_name_cell_links_to_detail_with_current_params() {
        let params = SearchParams::parse("hosts=h1&page=2");
        let result = QueryResult {
            pods: vec![pod("pod id/1", Some("nginx"))],
            total_rows: 1,
            current_page: 2,
        };
        let rows = build_rows(&result, &params);
        assert_eq!(
            rows[0].cells[0].href.as_deref(),
            Some("/ui/pods/detail/pod/pod%20id%2F1?hosts=h1&page=2")
        );
        assert!(rows[0].cells[1].href.is_none());
    }

    #[test]
    fn test_long_values_are_truncated_with_full_title() {
        let long = "x".repeat(100);
        let result = QueryResult {
            pods: vec![pod("p-1", Some(&long))],
            total_rows: 1,
            current_page: 0,
        };
        let rows = build_rows(&result, &SearchParams::new());
        assert_eq!(rows[0].cells[0].text.chars().count(), 40);
        assert_eq!(rows[0].cells[0].title, long);
    }

    #[test]
    fn test_header_links_cycle_sort_without_touching_page() {
        let params = SearchParams::parse("page=3&sortby=pod_name&desc=false");
        let vs = ViewState::decode(&params);
        let headers = build_headers(&vs, &params);
        assert_eq!(headers[0].indicator, "▲");
        assert_eq!(headers[0].href, "/ui/pods?page=3&sortby=pod_name&desc=true");
        assert_eq!(
            headers[3].href,
            "/ui/pods?page=3&sortby=kubernetes_state&desc=false"
        );
    }
}
