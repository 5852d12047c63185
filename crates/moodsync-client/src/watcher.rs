//! Authentication state observer
//!
//! Mirrors the token store into a snapshot that UI-side code can poll
//! cheaply. Reads the store once on construction and then follows its change
//! notifications until dropped.

use std::sync::{Arc, PoisonError, RwLock};

use moodsync_auth::{CredentialPair, Subscription, TokenStore};
use tracing::{info, warn};

/// Live view of whether a session is authenticated.
pub struct SessionWatcher {
    state: Arc<RwLock<Option<CredentialPair>>>,
    _subscription: Subscription,
}

impl SessionWatcher {
    pub fn new(store: &TokenStore) -> Self {
        let state = Arc::new(RwLock::new(None));

        let sink = state.clone();
        let subscription = store.subscribe(move |pair| {
            let mut current = sink.write().unwrap_or_else(PoisonError::into_inner);
            match (current.is_some(), pair) {
                (true, None) => warn!("session ended, login required"),
                (false, Some(_)) => info!("session started"),
                _ => {}
            }
            *current = pair.cloned();
        });

        // Hold the write lock while seeding so a concurrent notification
        // cannot be overwritten by the older initial read.
        {
            let mut current = state.write().unwrap_or_else(PoisonError::into_inner);
            *current = store.get();
        }

        Self {
            state,
            _subscription: subscription,
        }
    }

    /// True iff an access token is current.
    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|pair| pair.access().is_some())
    }

    pub fn current(&self) -> Option<CredentialPair> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
