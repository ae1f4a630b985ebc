use serde::Serialize;
use std::fmt;

use super::params::SearchParams;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const PAGE_SIZE_OPTIONS: [u32; 4] = [10, 25, 50, 100];

pub const PARAM_PAGE: &str = "page";
pub const PARAM_SIZE: &str = "size";
pub const PARAM_SORT_BY: &str = "sortby";
pub const PARAM_DESC: &str = "desc";
pub const PARAM_HOSTS: &str = "hosts";
pub const PARAM_CLUSTERS: &str = "clusters";
pub const PARAM_KUBERNETES_STATUS: &str = "kubernetesStatus";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterFamily {
    Hosts,
    Clusters,
    KubernetesStatus,
}

impl FilterFamily {
    pub const ALL: [FilterFamily; 3] = [
        FilterFamily::Hosts,
        FilterFamily::Clusters,
        FilterFamily::KubernetesStatus,
    ];

    pub fn param(self) -> &'static str {
        match self {
            FilterFamily::Hosts => PARAM_HOSTS,
            FilterFamily::Clusters => PARAM_CLUSTERS,
            FilterFamily::KubernetesStatus => PARAM_KUBERNETES_STATUS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterFamily::Hosts => "Host",
            FilterFamily::Clusters => "Cluster",
            FilterFamily::KubernetesStatus => "Kubernetes status",
        }
    }

    pub fn from_param(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.param() == key)
    }

    /// Parameter holding the editor's option search text. Not part of the
    /// view state, so it never changes what is fetched.
    pub fn search_param(self) -> &'static str {
        match self {
            FilterFamily::Hosts => "hostsSearch",
            FilterFamily::Clusters => "clustersSearch",
            FilterFamily::KubernetesStatus => "kubernetesStatusSearch",
        }
    }

    pub fn search_text(self, params: &SearchParams) -> &str {
        params.get(self.search_param()).unwrap_or_default().trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KubernetesStatus {
    #[serde(rename = "Running")]
    Running,
    #[serde(rename = "Not Running")]
    NotRunning,
}

impl KubernetesStatus {
    pub const ALL: [KubernetesStatus; 2] = [KubernetesStatus::Running, KubernetesStatus::NotRunning];

    pub fn as_str(self) -> &'static str {
        match self {
            KubernetesStatus::Running => "Running",
            KubernetesStatus::NotRunning => "Not Running",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Type-ahead narrowing of the fixed status list. Case-insensitive
    /// substring match; an empty query keeps every option.
    pub fn narrow(query: &str) -> Vec<KubernetesStatus> {
        let needle = query.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|st| needle.is_empty() || st.as_str().to_lowercase().contains(&needle))
            .collect()
    }
}

impl fmt::Display for KubernetesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<SortSpec>,
    pub hosts: Vec<String>,
    pub clusters: Vec<String>,
    pub kubernetes_status: Option<KubernetesStatus>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            hosts: Vec::new(),
            clusters: Vec::new(),
            kubernetes_status: None,
        }
    }
}

impl ViewState {
    pub fn decode(params: &SearchParams) -> Self {
        let page = params
            .get(PARAM_PAGE)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let page_size = params
            .get(PARAM_SIZE)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let sort = match (params.get(PARAM_SORT_BY), params.get(PARAM_DESC)) {
            (Some(column), Some(desc)) if !column.is_empty() => Some(SortSpec {
                column: column.to_string(),
                descending: desc == "true",
            }),
            _ => None,
        };

        Self {
            page,
            page_size,
            sort,
            hosts: owned(params.get_all(PARAM_HOSTS)),
            clusters: owned(params.get_all(PARAM_CLUSTERS)),
            kubernetes_status: params
                .get(PARAM_KUBERNETES_STATUS)
                .and_then(KubernetesStatus::parse),
        }
    }

    pub fn encode(&self) -> SearchParams {
        let mut params = SearchParams::new();
        if self.page > 0 {
            params.append(PARAM_PAGE, self.page.to_string());
        }
        if self.page_size != DEFAULT_PAGE_SIZE {
            params.append(PARAM_SIZE, self.page_size.to_string());
        }
        if let Some(ref sort) = self.sort {
            params.append(PARAM_SORT_BY, sort.column.clone());
            params.append(PARAM_DESC, sort.descending.to_string());
        }
        for host in &self.hosts {
            params.append(PARAM_HOSTS, host.clone());
        }
        for cluster in &self.clusters {
            params.append(PARAM_CLUSTERS, cluster.clone());
        }
        if let Some(status) = self.kubernetes_status {
            params.append(PARAM_KUBERNETES_STATUS, status.as_str());
        }
        params
    }
}

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}

pub fn applied_filter_count(params: &SearchParams) -> usize {
    FilterFamily::ALL
        .iter()
        .map(|f| params.get_all(f.param()).len())
        .sum()
}

pub fn applied_filters(params: &SearchParams) -> Vec<(FilterFamily, String)> {
    params
        .iter()
        .filter_map(|(k, v)| FilterFamily::from_param(k).map(|f| (f, v.to_string())))
        .collect()
}
