//! Runs queries against the shared session, memoized per `(sql, params)`.

use crate::cache::{Cache, EvictionPolicy};
use crate::error::AppError;
use crate::infra::DbSession;
use crate::query::{Dataset, Params, Query};
use std::sync::Arc;
use std::time::Duration;

/// Freshness window for executor results.
pub const QUERY_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub ttl: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { ttl: QUERY_TTL }
    }
}

pub struct QueryExecutor {
    session: Arc<dyn DbSession>,
    cache: Cache<Query, Arc<Dataset>>,
}

impl QueryExecutor {
    pub fn new(session: Arc<dyn DbSession>, config: ExecutorConfig) -> Self {
        Self {
            session,
            cache: Cache::new(EvictionPolicy::Ttl(config.ttl)),
        }
    }

    /// Execute `sql` with named `params`, reusing a result younger than the TTL.
    /// Failures are not cached and are never retried.
    pub fn run_query(&mut self, sql: &str, params: Params) -> Result<Arc<Dataset>, AppError> {
        let query = Query::new(sql, params);
        let session = Arc::clone(&self.session);
        self.cache.get_or_try_insert_with(query.clone(), || {
            log::info!("Executing query ({} params)", query.params.len());
            session.execute(&query).map(Arc::new)
        })
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}
