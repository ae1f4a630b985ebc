use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::cache::{Cached, Completion, FetchTicket, Lookup, QueryCache};
use super::PodSearch;
use crate::error::SearchError;
use crate::models::search::{PodSearchRequest, QueryResult};
use crate::models::view_state::ViewState;

type FetchResult = Result<Cached<Arc<QueryResult>>, SearchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Clone)]
pub struct Loaded {
    pub result: Arc<QueryResult>,
    pub fetched_at: DateTime<Utc>,
    /// Served from an expired entry while a refetch runs in the background.
    pub stale: bool,
}

impl From<Cached<Arc<QueryResult>>> for Loaded {
    fn from(c: Cached<Arc<QueryResult>>) -> Self {
        Self {
            result: c.value,
            fetched_at: c.fetched_at,
            stale: false,
        }
    }
}

/// Binds view state to pod searches through the stale-while-revalidate cache.
/// Requests for a key that is already being fetched join that fetch.
#[derive(Clone)]
pub struct QueryBinder {
    search: Arc<dyn PodSearch>,
    cache: Arc<dyn QueryCache<Arc<QueryResult>>>,
    in_flight: Arc<Mutex<HashMap<String, (u64, SharedFetch)>>>,
}

impl QueryBinder {
    pub fn new(search: Arc<dyn PodSearch>, cache: Arc<dyn QueryCache<Arc<QueryResult>>>) -> Self {
        Self {
            search,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn search(&self) -> &Arc<dyn PodSearch> {
        &self.search
    }

    pub async fn load_view(&self, vs: &ViewState) -> Result<Loaded, SearchError> {
        self.load(&PodSearchRequest::from_view_state(vs)).await
    }

    /// Fresh hit: served as is. Stale hit: served immediately, refetched in
    /// the background. Miss: waits for the fetch.
    pub async fn load(&self, request: &PodSearchRequest) -> Result<Loaded, SearchError> {
        let key = request.cache_key();
        match self.cache.lookup(&key).await {
            Lookup::Fresh(cached) => {
                debug!(%key, "cache hit");
                Ok(cached.into())
            }
            Lookup::Stale(cached) => {
                debug!(%key, "serving stale, revalidating");
                // Errors are logged by the fetch itself; the stale entry stays.
                drop(self.fetch(key, request.clone(), false).await);
                Ok(Loaded {
                    stale: true,
                    ..Loaded::from(cached)
                })
            }
            Lookup::Miss => {
                debug!(%key, "cache miss");
                self.fetch(key, request.clone(), false)
                    .await
                    .await
                    .map(Loaded::from)
            }
        }
    }

    /// Starts a new fetch even if one is in flight for the same key. The
    /// older fetch's result is discarded when it lands after this one.
    pub async fn refresh(&self, request: &PodSearchRequest) -> Result<Loaded, SearchError> {
        self.fetch(request.cache_key(), request.clone(), true)
            .await
            .await
            .map(Loaded::from)
    }

    async fn fetch(&self, key: String, request: PodSearchRequest, force: bool) -> SharedFetch {
        let mut in_flight = self.in_flight.lock().await;
        if !force {
            if let Some((_, fut)) = in_flight.get(&key) {
                debug!(%key, "joining in-flight fetch");
                return fut.clone();
            }
        }

        let ticket = self.cache.begin_fetch(&key).await;
        let generation = ticket.generation;
        let fut = run_fetch(
            self.search.clone(),
            self.cache.clone(),
            self.in_flight.clone(),
            ticket,
            request,
        )
        .boxed()
        .shared();
        in_flight.insert(key, (generation, fut.clone()));

        // Driven to completion even if every waiter goes away, so the entry
        // above is always removed.
        let driver = fut.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });
        fut
    }
}

async fn run_fetch(
    search: Arc<dyn PodSearch>,
    cache: Arc<dyn QueryCache<Arc<QueryResult>>>,
    in_flight: Arc<Mutex<HashMap<String, (u64, SharedFetch)>>>,
    ticket: FetchTicket,
    request: PodSearchRequest,
) -> FetchResult {
    let outcome = search.search_pods(&request).await;

    {
        let mut in_flight = in_flight.lock().await;
        if matches!(in_flight.get(&ticket.key), Some((g, _)) if *g == ticket.generation) {
            in_flight.remove(&ticket.key);
        }
    }

    match outcome {
        Ok(result) => {
            let value = Arc::new(result);
            if cache.complete(&ticket, value.clone()).await == Completion::Discarded {
                debug!(key = %ticket.key, "fetch superseded");
            }
            Ok(Cached {
                value,
                fetched_at: Utc::now(),
            })
        }
        Err(e) => {
            warn!(key = %ticket.key, "pod search failed: {}", e);
            Err(e)
        }
    }
}
