//! kvdoc mock node.
//!
//! An in-memory stand-in for a cluster node. [`MockCluster`] implements the
//! engine's transport directly, and [`app`] serves the same calls over HTTP
//! so the engine can be exercised without a real cluster.

pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod subdoc;

pub use cluster::{MockCluster, Topology};
pub use config::Config;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cluster: Arc<MockCluster>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            cluster: MockCluster::new_shared(config.clone()),
            config: Arc::new(config),
        }
    }
}

/// Build the router with tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
