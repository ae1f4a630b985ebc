pub mod binder;
pub mod cache;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::SearchError;
use crate::models::search::{
    ClusterRecord, FieldFilters, FilterOption, HostRecord, NodeFilter, PodRecord,
    PodSearchRequest, QueryResult, SearchCountResp, SearchNodeReq, Window,
};

pub const OPTION_LIMIT: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    VulnerabilityScan,
}

impl ScanType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanType::VulnerabilityScan => "VulnerabilityScan",
        }
    }
}

#[async_trait]
pub trait PodSearch: Send + Sync {
    async fn search_pods(&self, req: &PodSearchRequest) -> Result<QueryResult, SearchError>;

    async fn get_pod(&self, node_id: &str) -> Result<Option<PodRecord>, SearchError>;

    async fn host_options(
        &self,
        search_text: &str,
        scan_type: ScanType,
    ) -> Result<Vec<FilterOption>, SearchError>;

    async fn cluster_options(&self, search_text: &str) -> Result<Vec<FilterOption>, SearchError>;
}

pub struct SearchClient {
    pub base_url: String,
    api_token: Option<String>,
    http: Client,
}

impl SearchClient {
    pub fn new(
        base_url: String,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            http,
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, SearchError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(ref token) = self.api_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| SearchError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| SearchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

fn option_request(filters: FieldFilters) -> SearchNodeReq {
    SearchNodeReq {
        node_filter: NodeFilter::from(filters),
        window: Window {
            offset: 0,
            size: OPTION_LIMIT,
        },
    }
}

fn host_options_request(search_text: &str, scan_type: ScanType) -> SearchNodeReq {
    let mut filters = FieldFilters::default();
    filters.contains.insert("active".to_string(), json!([true]));
    match scan_type {
        // Vulnerability scans need a running agent on the host.
        ScanType::VulnerabilityScan => {
            filters
                .contains
                .insert("agent_running".to_string(), json!([true]));
        }
    }
    if !search_text.is_empty() {
        filters
            .matches
            .insert("host_name".to_string(), json!([search_text]));
    }
    option_request(filters)
}

fn cluster_options_request(search_text: &str) -> SearchNodeReq {
    let mut filters = FieldFilters::default();
    filters.contains.insert("active".to_string(), json!([true]));
    if !search_text.is_empty() {
        filters
            .matches
            .insert("node_name".to_string(), json!([search_text]));
    }
    option_request(filters)
}

fn pod_by_id_request(node_id: &str) -> SearchNodeReq {
    let mut filters = FieldFilters::default();
    filters.contains.insert("node_id".to_string(), json!([node_id]));
    SearchNodeReq {
        node_filter: NodeFilter::from(filters),
        window: Window { offset: 0, size: 1 },
    }
}

#[async_trait]
impl PodSearch for SearchClient {
    async fn search_pods(&self, req: &PodSearchRequest) -> Result<QueryResult, SearchError> {
        let search_body = req.to_search_body();
        let count_body = req.to_count_body();
        let (pods, count) = tokio::try_join!(
            self.post_json::<Vec<PodRecord>>("/deepfence/search/pods", &search_body),
            self.post_json::<SearchCountResp>("/deepfence/search/count/pods", &count_body),
        )?;

        debug!(
            page = req.page,
            rows = pods.len(),
            lookahead = count.count,
            "pods search"
        );

        Ok(QueryResult {
            pods,
            total_rows: req.offset() + count.count,
            current_page: req.page,
        })
    }

    async fn get_pod(&self, node_id: &str) -> Result<Option<PodRecord>, SearchError> {
        let pods: Vec<PodRecord> = self
            .post_json("/deepfence/search/pods", &pod_by_id_request(node_id))
            .await?;
        Ok(pods.into_iter().find(|p| p.node_id == node_id))
    }

    async fn host_options(
        &self,
        search_text: &str,
        scan_type: ScanType,
    ) -> Result<Vec<FilterOption>, SearchError> {
        let hosts: Vec<HostRecord> = self
            .post_json(
                "/deepfence/search/hosts",
                &host_options_request(search_text, scan_type),
            )
            .await?;
        Ok(hosts
            .into_iter()
            .filter(|h| !h.host_name.is_empty())
            .map(|h| FilterOption {
                label: if h.node_name.is_empty() {
                    h.host_name.clone()
                } else {
                    h.node_name
                },
                value: h.host_name,
            })
            .collect())
    }

    async fn cluster_options(&self, search_text: &str) -> Result<Vec<FilterOption>, SearchError> {
        let clusters: Vec<ClusterRecord> = self
            .post_json(
                "/deepfence/search/kubernetes-clusters",
                &cluster_options_request(search_text),
            )
            .await?;
        Ok(clusters
            .into_iter()
            .filter(|c| !c.node_name.is_empty())
            .map(|c| FilterOption {
                value: c.node_name.clone(),
                label: c.node_name,
            })
            .collect())
    }
}
