use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use padawan_core::infra::cache::CacheGateway;
use padawan_core::infra::relational::RelationalGateway;

use crate::auth::Credentials;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheGateway>,
    pub relational: Arc<RelationalGateway>,
    pub credentials: Arc<Credentials>,
    inserts: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(cache: Arc<CacheGateway>, relational: Arc<RelationalGateway>, credentials: Credentials) -> Self {
        Self {
            cache,
            relational,
            credentials: Arc::new(credentials),
            inserts: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Current counter value; the counter
    /// moves on to the next one.
    pub fn next_insert(&self) -> u64 {
        self.inserts.fetch_add(1, Ordering::SeqCst)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::SeqCst)
    }
}
