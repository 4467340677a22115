//! API Server - HTTP introspection endpoints for test harnesses

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::handlers::{self, AppState};
use crate::error::Result;
use crate::storage::MailStore;

/// Build the router.
///
/// Methods other than the ones routed here get `405 Method Not Allowed`.
pub fn router(storage: Arc<MailStore>) -> Router {
    let state = Arc::new(AppState { storage });

    Router::new()
        .route("/clear", post(handlers::clear))
        .route("/count", get(handlers::count))
        .with_state(state)
}

/// API Server bound to its listen address
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Bind the listener. Failing here aborts startup.
    pub async fn bind(addr: &str, storage: Arc<MailStore>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("API server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router: router(storage),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
