use std::sync::Arc;

use salescore_db::gateway::PgDirectoryGateway;
use salescore_db::store::PgEvaluationStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: salescore_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Directory reads for the authorizer and pipeline.
    pub directory: PgDirectoryGateway,
    /// Evaluation persistence for the pipeline.
    pub evaluations: PgEvaluationStore,
}

impl AppState {
    pub fn new(pool: salescore_db::DbPool, config: ServerConfig) -> Self {
        Self {
            directory: PgDirectoryGateway::new(pool.clone()),
            evaluations: PgEvaluationStore::new(pool.clone()),
            pool,
            config: Arc::new(config),
        }
    }
}
