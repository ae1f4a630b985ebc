use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{PodSearch, ScanType};
use crate::error::SearchError;
use crate::models::search::{FilterOption, PodRecord, PodSearchRequest, QueryResult};

/// In-memory search backend for tests.
#[derive(Default)]
pub struct FakeSearch {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub gate: Option<Arc<Notify>>,
    pub pods: Option<Vec<PodRecord>>,
    pub total_rows: u64,
    pub hosts: Vec<FilterOption>,
    pub clusters: Vec<FilterOption>,
    pub requests: Mutex<Vec<PodSearchRequest>>,
}

impl FakeSearch {
    pub fn with_pods(pods: Vec<PodRecord>, total_rows: u64) -> Self {
        Self {
            pods: Some(pods),
            total_rows,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn error() -> SearchError {
        SearchError::Status {
            url: "/deepfence/search/pods".to_string(),
            status: 500,
            body: "boom".to_string(),
        }
    }
}

pub fn option(value: &str) -> FilterOption {
    FilterOption {
        value: value.to_string(),
        label: value.to_string(),
    }
}

pub fn pod(node_id: &str, pod_name: &str) -> PodRecord {
    PodRecord {
        node_id: node_id.to_string(),
        pod_name: Some(pod_name.to_string()),
        kubernetes_cluster_name: Some("prod".to_string()),
        kubernetes_namespace: Some("default".to_string()),
        kubernetes_state: Some("Running".to_string()),
        ..Default::default()
    }
}

fn matches_text(option: &FilterOption, text: &str) -> bool {
    text.is_empty() || option.value.contains(text)
}

#[async_trait]
impl PodSearch for FakeSearch {
    async fn search_pods(&self, req: &PodSearchRequest) -> Result<QueryResult, SearchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(Self::error());
        }
        let (pods, total_rows) = match self.pods {
            Some(ref pods) => (pods.clone(), self.total_rows),
            None => (
                vec![PodRecord {
                    node_id: format!("pod-call-{}", call),
                    ..Default::default()
                }],
                1,
            ),
        };
        Ok(QueryResult {
            pods,
            total_rows,
            current_page: req.page,
        })
    }

    async fn get_pod(&self, node_id: &str) -> Result<Option<PodRecord>, SearchError> {
        if self.fail {
            return Err(Self::error());
        }
        Ok(self
            .pods
            .iter()
            .flatten()
            .find(|p| p.node_id == node_id)
            .cloned())
    }

    async fn host_options(
        &self,
        search_text: &str,
        _scan_type: ScanType,
    ) -> Result<Vec<FilterOption>, SearchError> {
        Ok(self
            .hosts
            .iter()
            .filter(|o| matches_text(o, search_text))
            .cloned()
            .collect())
    }

    async fn cluster_options(&self, search_text: &str) -> Result<Vec<FilterOption>, SearchError> {
        Ok(self
            .clusters
            .iter()
            .filter(|o| matches_text(o, search_text))
            .cloned()
            .collect())
    }
}
