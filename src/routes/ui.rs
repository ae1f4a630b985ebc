use askama::Template;
use axum::{
    extract::{Path, RawQuery, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{debug, info, warn};

use crate::clients::binder::Loaded;
use crate::clients::ScanType;
use crate::error::AppError;
use crate::helpers::human_time;
use crate::models::change::ViewStateChange;
use crate::models::params::SearchParams;
use crate::models::search::{FilterOption, PodRecord, PodSearchRequest};
use crate::models::store::{ParamStore, ViewStateStore};
use crate::models::table::{build_headers, build_rows, HeaderView, RowView, NO_DATA_TEXT};
use crate::models::view_state::{FilterFamily, KubernetesStatus, ViewState};
use crate::models::views::*;
use crate::AppState;

// --- Template Structs ---

#[derive(Debug, Clone)]
pub struct OverlayView {
    pub node_id: String,
    pub node_type: String,
    pub fields: Vec<(String, String)>,
    pub close_href: String,
}

#[derive(Template)]
#[template(path = "pods.html")]
pub struct PodsTemplate {
    pub title: String,
    pub filters_open: bool,
    pub filter_count: usize,
    pub badges: Vec<BadgeView>,
    pub clear_all_href: String,
    pub return_to: String,
    pub status_search: SearchBoxView,
    pub hosts_search: SearchBoxView,
    pub clusters_search: SearchBoxView,
    pub status_options: Vec<OptionView>,
    pub host_options: Vec<OptionView>,
    pub cluster_options: Vec<OptionView>,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub no_data_text: String,
    pub pagination: PaginationView,
    pub updated: String,
    pub stale: bool,
    pub overlay: Option<OverlayView>,
}

fn render_template(tmpl: &impl Template) -> Result<Response, AppError> {
    Ok(Html(tmpl.render()?).into_response())
}

pub struct FilterLists {
    pub hosts: Vec<FilterOption>,
    pub clusters: Vec<FilterOption>,
}

pub fn build_overlay(selected: &SelectedNode, pod: &PodRecord, params: &SearchParams) -> OverlayView {
    let field = |label: &str, value: &Option<String>| {
        (label.to_string(), value.clone().unwrap_or_else(|| "-".to_string()))
    };
    OverlayView {
        node_id: selected.node_id.clone(),
        node_type: selected.node_type.as_str().to_string(),
        fields: vec![
            field("Pod name", &pod.pod_name),
            field("Cluster", &pod.kubernetes_cluster_name),
            field("Namespace", &pod.kubernetes_namespace),
            field("State", &pod.kubernetes_state),
            field("Host", &pod.host_name),
        ],
        close_href: params.href("/ui/pods"),
    }
}

pub fn build_pods_page(
    params: &SearchParams,
    loaded: &Loaded,
    lists: &FilterLists,
    overlay: Option<OverlayView>,
) -> PodsTemplate {
    let vs = ViewState::decode(params);
    let summary = build_filter_summary(params);

    PodsTemplate {
        title: "Pods".to_string(),
        filters_open: panel_visibility(params).is_expanded(),
        filter_count: summary.count,
        badges: summary.badges,
        clear_all_href: summary.clear_all_href,
        return_to: params.to_query_string(),
        status_search: build_search_box(params, FilterFamily::KubernetesStatus),
        hosts_search: build_search_box(params, FilterFamily::Hosts),
        clusters_search: build_search_box(params, FilterFamily::Clusters),
        status_options: status_option_views(
            FilterFamily::KubernetesStatus.search_text(params),
            vs.kubernetes_status,
        ),
        host_options: build_option_views(&lists.hosts, &vs.hosts),
        cluster_options: build_option_views(&lists.clusters, &vs.clusters),
        headers: build_headers(&vs, params),
        rows: build_rows(&loaded.result, params),
        no_data_text: NO_DATA_TEXT.to_string(),
        pagination: build_pagination(&loaded.result, &vs, params),
        updated: human_time(Some(loaded.fetched_at)),
        stale: loaded.stale,
        overlay,
    }
}

async fn filter_lists(state: &AppState, params: &SearchParams) -> FilterLists {
    let search = state.binder.search();
    let (hosts, clusters) = tokio::join!(
        search.host_options(
            FilterFamily::Hosts.search_text(params),
            ScanType::VulnerabilityScan
        ),
        search.cluster_options(FilterFamily::Clusters.search_text(params)),
    );
    FilterLists {
        hosts: hosts.unwrap_or_else(|e| {
            warn!("loading host filter options: {}", e);
            Vec::new()
        }),
        clusters: clusters.unwrap_or_else(|e| {
            warn!("loading cluster filter options: {}", e);
            Vec::new()
        }),
    }
}

async fn render_pods(
    state: &AppState,
    params: &SearchParams,
    selected: Option<SelectedNode>,
) -> Result<Response, AppError> {
    let vs = ViewState::decode(params);
    let (loaded, lists) = tokio::join!(state.binder.load_view(&vs), filter_lists(state, params));
    let loaded = loaded?;

    let overlay = match selected {
        Some(sel) => {
            let on_page = loaded
                .result
                .pods
                .iter()
                .find(|p| p.node_id == sel.node_id)
                .cloned();
            let pod = match on_page {
                Some(p) => p,
                None => state
                    .binder
                    .search()
                    .get_pod(&sel.node_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("pod {:?}", sel.node_id)))?,
            };
            Some(build_overlay(&sel, &pod, params))
        }
        None => None,
    };

    render_template(&build_pods_page(params, &loaded, &lists, overlay))
}

// --- Pods ---

pub async fn handle_pods(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let params = SearchParams::parse(query.as_deref().unwrap_or_default());
    render_pods(&state, &params, None).await
}

pub async fn handle_pod_detail(
    State(state): State<AppState>,
    Path((node_type, node_id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let node_type = NodeType::parse(&node_type)
        .ok_or_else(|| AppError::NotFound(format!("node type {:?}", node_type)))?;
    let params = SearchParams::parse(query.as_deref().unwrap_or_default());
    let selected = SelectedNode { node_id, node_type };
    render_pods(&state, &params, Some(selected)).await
}

// --- View state changes ---

pub fn filter_change(form: &SearchParams) -> Result<ViewStateChange, AppError> {
    let action = form.get("action").unwrap_or("set");
    if action == "clear_all" {
        return Ok(ViewStateChange::ClearAllFilters);
    }

    let family = form
        .get("family")
        .and_then(FilterFamily::from_param)
        .ok_or_else(|| AppError::BadRequest("unknown filter family".to_string()))?;
    let values: Vec<String> = form
        .get_all("value")
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    match (action, family) {
        ("clear", f) => Ok(ViewStateChange::ClearFilter(f)),
        ("set", FilterFamily::KubernetesStatus) => Ok(ViewStateChange::SetKubernetesStatus(
            values.first().and_then(|v| KubernetesStatus::parse(v)),
        )),
        ("set", f) => Ok(ViewStateChange::ReplaceFilter { family: f, values }),
        (other, _) => Err(AppError::BadRequest(format!("unknown action {:?}", other))),
    }
}

pub fn page_size_change(form: &SearchParams) -> Result<ViewStateChange, AppError> {
    form.get("size")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|s| *s > 0)
        .map(ViewStateChange::SetPageSize)
        .ok_or_else(|| AppError::BadRequest("invalid page size".to_string()))
}

fn apply_and_redirect(form: &SearchParams, change: &ViewStateChange) -> Response {
    let store = ParamStore::from_query(form.get("return_to").unwrap_or_default());
    let updates = store.subscribe();
    let next = store.apply(change);
    if updates.has_changed().unwrap_or(false) {
        info!(?change, "view state change");
    } else {
        debug!(?change, "view state unchanged");
    }
    Redirect::to(&next.href("/ui/pods")).into_response()
}

pub async fn handle_filters(body: String) -> Result<Response, AppError> {
    let form = SearchParams::parse(&body);
    let change = filter_change(&form)?;
    Ok(apply_and_redirect(&form, &change))
}

pub async fn handle_page_size(body: String) -> Result<Response, AppError> {
    let form = SearchParams::parse(&body);
    let change = page_size_change(&form)?;
    Ok(apply_and_redirect(&form, &change))
}

/// Forces a refetch of the current view, then returns to it.
pub async fn handle_refresh(
    State(state): State<AppState>,
    body: String,
) -> Result<Response, AppError> {
    let form = SearchParams::parse(&body);
    let store = ParamStore::from_query(form.get("return_to").unwrap_or_default());
    state
        .binder
        .refresh(&PodSearchRequest::from_view_state(&store.view_state()))
        .await?;
    Ok(Redirect::to(&store.get().href("/ui/pods")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::binder::QueryBinder;
    use crate::clients::cache::{CachePolicy, SwrCache};
    use crate::clients::testing::{option, pod, FakeSearch};
    use crate::models::search::QueryResult;
    use axum::http::{header, StatusCode};
    use chrono::Utc;
    use std::sync::Arc;

    fn loaded(pods: Vec<PodRecord>, total_rows: u64, current_page: u32) -> Loaded {
        Loaded {
            result: Arc::new(QueryResult {
                pods,
                total_rows,
                current_page,
            }),
            fetched_at: Utc::now(),
            stale: false,
        }
    }

    fn lists() -> FilterLists {
        FilterLists {
            hosts: vec![option("h1"), option("h2")],
            clusters: vec![option("prod")],
        }
    }

    fn form(s: &str) -> SearchParams {
        SearchParams::parse(s)
    }

    #[test]
    fn test_empty_result_renders_placeholder_and_no_rows() {
        let params = SearchParams::new();
        let page = build_pods_page(&params, &loaded(Vec::new(), 0, 0), &lists(), None);
        assert!(page.rows.is_empty());
        let html = page.render().unwrap();
        assert!(html.contains("No hosts are connected"));
        assert!(!html.contains("data-row-id"));
    }

    #[test]
    fn test_rows_render_with_row_ids_and_detail_links() {
        let params = form("hosts=h1");
        let page = build_pods_page(
            &params,
            &loaded(vec![pod("p-1", "nginx"), pod("p-2", "redis")], 2, 0),
            &lists(),
            None,
        );
        let html = page.render().unwrap();
        assert!(html.contains(r#"data-row-id="p-1""#));
        assert!(html.contains(r#"data-row-id="p-2""#));
        assert!(html.contains("/ui/pods/detail/pod/p-1?hosts=h1"));
        assert!(html.contains("Host: h1"));
        assert!(!html.contains("role=\"dialog\""));
    }

    #[test]
    fn test_filter_panel_starts_collapsed_with_count() {
        let params = form("hosts=h1&hosts=h2&clusters=prod");
        let page = build_pods_page(&params, &loaded(Vec::new(), 0, 0), &lists(), None);
        assert!(!page.filters_open);
        assert_eq!(page.filter_count, 3);
        assert!(page.host_options.iter().all(|o| o.selected));
        assert!(page.cluster_options[0].selected);
    }

    #[test]
    fn test_overlay_opens_for_clicked_row_and_closes_to_same_params() {
        let params = form("hosts=h1&page=2&sortby=pod_name&desc=true");
        let record = pod("p-1", "nginx");
        let selected = SelectedNode {
            node_id: "p-1".to_string(),
            node_type: NodeType::Pod,
        };
        let overlay = build_overlay(&selected, &record, &params);
        assert_eq!(overlay.node_id, "p-1");
        assert_eq!(overlay.node_type, "pod");
        assert_eq!(
            SearchParams::parse(overlay.close_href.trim_start_matches("/ui/pods?")),
            params
        );

        let page = build_pods_page(&params, &loaded(vec![record], 1, 2), &lists(), Some(overlay));
        let html = page.render().unwrap();
        assert!(html.contains("role=\"dialog\""));
        assert!(html.contains("nginx"));
    }

    #[test]
    fn test_filter_change_from_forms() {
        assert_eq!(
            filter_change(&form("family=hosts&action=set&value=h1&value=h2")).unwrap(),
            ViewStateChange::ReplaceFilter {
                family: FilterFamily::Hosts,
                values: vec!["h1".to_string(), "h2".to_string()],
            }
        );
        assert_eq!(
            filter_change(&form("family=kubernetesStatus&action=set&value=Not+Running")).unwrap(),
            ViewStateChange::SetKubernetesStatus(Some(KubernetesStatus::NotRunning))
        );
        assert_eq!(
            filter_change(&form("family=kubernetesStatus&action=set&value=")).unwrap(),
            ViewStateChange::SetKubernetesStatus(None)
        );
        assert_eq!(
            filter_change(&form("family=clusters&action=clear")).unwrap(),
            ViewStateChange::ClearFilter(FilterFamily::Clusters)
        );
        assert_eq!(
            filter_change(&form("action=clear_all")).unwrap(),
            ViewStateChange::ClearAllFilters
        );
        assert!(filter_change(&form("family=nope&action=set")).is_err());
        assert!(filter_change(&form("family=hosts&action=explode")).is_err());
    }

    #[test]
    fn test_page_size_change_from_form() {
        assert_eq!(
            page_size_change(&form("size=50")).unwrap(),
            ViewStateChange::SetPageSize(50)
        );
        assert!(page_size_change(&form("size=0")).is_err());
        assert!(page_size_change(&form("size=abc")).is_err());
    }

    #[tokio::test]
    async fn test_filter_post_redirects_with_page_cleared() {
        let body = "return_to=hosts%3Dh1%26page%3D3%26size%3D10&family=clusters&action=set&value=prod";
        let resp = handle_filters(body.to_string()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/ui/pods?hosts=h1&size=10&clusters=prod"
        );
    }

    fn state(search: Arc<FakeSearch>) -> AppState {
        let cache: Arc<SwrCache<Arc<QueryResult>>> =
            Arc::new(SwrCache::new(CachePolicy::default()));
        AppState {
            binder: QueryBinder::new(search, cache),
        }
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_pods_handler_renders_search_results() {
        let search = Arc::new(FakeSearch::with_pods(vec![pod("p-1", "nginx")], 1));
        let resp = handle_pods(State(state(search.clone())), RawQuery(Some("size=10".to_string())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains(r#"data-row-id="p-1""#));
        assert!(html.contains("Showing 1-1 of 1"));

        let requests = search.requests.lock().unwrap();
        assert_eq!(requests[0].page_size, 10);
    }

    #[tokio::test]
    async fn test_detail_handler_opens_overlay() {
        let search = Arc::new(FakeSearch::with_pods(vec![pod("p-9", "worker")], 1));
        let resp = handle_pod_detail(
            State(state(search)),
            Path(("pod".to_string(), "p-9".to_string())),
            RawQuery(None),
        )
        .await
        .unwrap();
        let html = body_text(resp).await;
        assert!(html.contains("role=\"dialog\""));
        assert!(html.contains("worker"));
    }

    #[tokio::test]
    async fn test_search_text_narrows_editor_options() {
        let search = Arc::new(FakeSearch {
            hosts: vec![option("web-1"), option("db-1"), option("web-2")],
            clusters: vec![option("prod"), option("staging")],
            ..Default::default()
        });
        let resp = handle_pods(
            State(state(search)),
            RawQuery(Some(
                "hosts=db-1&hostsSearch=web&kubernetesStatusSearch=not".to_string(),
            )),
        )
        .await
        .unwrap();
        let html = body_text(resp).await;

        assert!(html.contains(r#"<option value="web-1""#));
        assert!(html.contains(r#"<option value="web-2""#));
        // Still selected, so it stays listed even though the search misses it.
        assert!(html.contains(r#"<option value="db-1" selected"#));
        assert!(html.contains(r#"<option value="prod""#));
        assert!(html.contains(r#"<option value="Not Running""#));
        assert!(!html.contains(r#"<option value="Running""#));
        assert!(html.contains(r#"name="hostsSearch" value="web""#));
        assert!(html.contains("<details class=\"filter-panel\" open>"));
    }

    #[test]
    fn test_search_text_does_not_change_cache_key() {
        let with_search = SearchParams::parse("hosts=h1&hostsSearch=web");
        let without = SearchParams::parse("hosts=h1");
        assert_eq!(
            PodSearchRequest::from_view_state(&ViewState::decode(&with_search)).cache_key(),
            PodSearchRequest::from_view_state(&ViewState::decode(&without)).cache_key()
        );
    }

    #[tokio::test]
    async fn test_detail_handler_rejects_unknown_node_type() {
        let search = Arc::new(FakeSearch::default());
        let err = handle_pod_detail(
            State(state(search)),
            Path(("container".to_string(), "c-1".to_string())),
            RawQuery(None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_failure_reaches_error_page() {
        let search = Arc::new(FakeSearch {
            fail: true,
            ..Default::default()
        });
        let err = handle_pods(State(state(search)), RawQuery(None))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_refresh_refetches_and_returns_to_view() {
        let search = Arc::new(FakeSearch::default());
        let st = state(search.clone());
        handle_pods(State(st.clone()), RawQuery(Some("hosts=h1".to_string())))
            .await
            .unwrap();
        assert_eq!(search.call_count(), 1);

        let resp = handle_refresh(State(st), "return_to=hosts%3Dh1".to_string())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/ui/pods?hosts=h1");
        assert_eq!(search.call_count(), 2);
    }

    #[tokio::test]
    async fn test_no_op_change_redirects_to_same_view() {
        let body = "return_to=size%3D10%26sortby%3Dpod_name%26desc%3Dfalse&action=clear_all";
        let resp = handle_filters(body.to_string()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/ui/pods?size=10&sortby=pod_name&desc=false"
        );
    }

    #[tokio::test]
    async fn test_page_size_post_redirects_to_first_page() {
        let body = "return_to=page%3D4%26sortby%3Dpod_name%26desc%3Dtrue&size=100";
        let resp = handle_page_size(body.to_string()).await.unwrap();
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/ui/pods?sortby=pod_name&desc=true&size=100"
        );
    }
}
