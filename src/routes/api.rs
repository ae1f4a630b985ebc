use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::clients::ScanType;
use crate::error::AppError;
use crate::models::search::FilterOption;
use crate::models::view_state::KubernetesStatus;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OptionQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn handle_status_options(Query(query): Query<OptionQuery>) -> Json<Vec<FilterOption>> {
    Json(
        KubernetesStatus::narrow(&query.q)
            .into_iter()
            .map(|st| FilterOption {
                value: st.as_str().to_string(),
                label: st.as_str().to_string(),
            })
            .collect(),
    )
}

pub async fn handle_host_options(
    State(state): State<AppState>,
    Query(query): Query<OptionQuery>,
) -> Result<Json<Vec<FilterOption>>, AppError> {
    let scan_type = ScanType::VulnerabilityScan;
    debug!(q = %query.q, scan_type = scan_type.as_str(), "host options");
    let options = state
        .binder
        .search()
        .host_options(query.q.trim(), scan_type)
        .await?;
    Ok(Json(options))
}

pub async fn handle_cluster_options(
    State(state): State<AppState>,
    Query(query): Query<OptionQuery>,
) -> Result<Json<Vec<FilterOption>>, AppError> {
    debug!(q = %query.q, "cluster options");
    let options = state
        .binder
        .search()
        .cluster_options(query.q.trim())
        .await?;
    Ok(Json(options))
}

// --- Health ---

pub async fn handle_healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}
