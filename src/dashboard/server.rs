//! # Dashboard server
//!
//! Serves the last run report until the process is stopped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::routes::dashboard_routes;
use crate::config::DashboardConfig;
use crate::observability::{Event, Logger};
use crate::verify::RunReport;

/// HTTP server for the results dashboard
pub struct DashboardServer {
    config: DashboardConfig,
    router: Router,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, report: Arc<RunReport>) -> Self {
        let router = dashboard_routes(report);
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve
    pub async fn start(self, logger: &Logger) -> io::Result<()> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid dashboard address '{}': {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?.to_string();
        logger.info(Event::DashboardServing, &[("address", local.as_str())]);

        axum::serve(listener, self.router).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::ResultTree;

    #[test]
    fn test_server_with_custom_port() {
        let config = DashboardConfig {
            port: 9090,
            ..DashboardConfig::default()
        };
        let server = DashboardServer::new(config, Arc::new(RunReport::new(ResultTree::new())));
        assert_eq!(server.socket_addr(), "0.0.0.0:9090");
        let _router = server.router();
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let config = DashboardConfig {
            host: "not a host".to_string(),
            ..DashboardConfig::default()
        };
        let server = DashboardServer::new(config, Arc::new(RunReport::new(ResultTree::new())));
        let err = server.start(&Logger::discard()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
