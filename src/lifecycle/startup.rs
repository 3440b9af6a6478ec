//! Startup orchestration.
//!
//! Fail fast: the store must answer before the listener binds, so the
//! service never accepts traffic it cannot serve.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admission::PipelineError;
use crate::config::GateConfig;
use crate::http::HttpServer;
use crate::store::{ResourceStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store is not reachable: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build admission pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Ping the store, build the server and bind the listener, in that order.
pub async fn prepare(
    config: GateConfig,
    store: Arc<dyn ResourceStore>,
) -> Result<(HttpServer, TcpListener), StartupError> {
    store.ping().await?;
    tracing::info!("Store reachable");

    let address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, store)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    Ok((server, listener))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_unreachable_store_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);

        let mut config = GateConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();

        let result = prepare(config, store).await;
        assert!(matches!(result, Err(StartupError::Store(_))));
    }

    #[tokio::test]
    async fn test_prepare_binds_listener() {
        let mut config = GateConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();

        let (_server, listener) = prepare(config, Arc::new(MemoryStore::new())).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
