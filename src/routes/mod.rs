pub mod api;
pub mod ui;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Filter option lookups
        .route("/ui/pods/options/status", get(api::handle_status_options))
        .route("/ui/pods/options/hosts", get(api::handle_host_options))
        .route("/ui/pods/options/clusters", get(api::handle_cluster_options))
        // Health
        .route("/healthz", get(api::handle_healthz))
        // Pods UI
        .route("/ui/pods", get(ui::handle_pods))
        .route(
            "/ui/pods/detail/{node_type}/{node_id}",
            get(ui::handle_pod_detail),
        )
        .route("/ui/pods/filters", post(ui::handle_filters))
        .route("/ui/pods/size", post(ui::handle_page_size))
        .route("/ui/pods/refresh", post(ui::handle_refresh))
        // Static files
        .nest_service("/ui/static", ServeDir::new("static"))
        // Root redirect
        .route(
            "/",
            get(|| async {
                axum::response::Redirect::to("/ui/pods")
            }),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
