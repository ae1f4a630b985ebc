use tokio::sync::watch;

use super::change::{self, ViewStateChange};
use super::params::SearchParams;
use super::view_state::ViewState;

pub trait ViewStateStore {
    fn get(&self) -> SearchParams;
    fn set(&self, params: SearchParams);
    fn subscribe(&self) -> watch::Receiver<SearchParams>;

    fn view_state(&self) -> ViewState {
        ViewState::decode(&self.get())
    }

    fn apply(&self, change: &ViewStateChange) -> SearchParams {
        let next = change::applied(&self.get(), change);
        self.set(next.clone());
        next
    }
}

/// Store backed by a `watch` channel. In the console one is created per
/// request from the incoming query string; the final value becomes the
/// redirect target.
pub struct ParamStore {
    tx: watch::Sender<SearchParams>,
}

impl ParamStore {
    pub fn new(initial: SearchParams) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn from_query(query: &str) -> Self {
        Self::new(SearchParams::parse(query))
    }
}

impl ViewStateStore for ParamStore {
    fn get(&self) -> SearchParams {
        self.tx.borrow().clone()
    }

    fn set(&self, params: SearchParams) {
        self.tx.send_if_modified(|current| {
            if *current == params {
                false
            } else {
                *current = params;
                true
            }
        });
    }

    fn subscribe(&self) -> watch::Receiver<SearchParams> {
        self.tx.subscribe()
    }
}
