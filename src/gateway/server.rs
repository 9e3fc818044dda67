//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::auth::RequestGate;
use super::router::create_router;
use crate::config::Config;
use crate::{Error, Result};

/// HTTP server fronted by the client-certificate gate
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Shared gate, built once at startup
    gate: Arc<RequestGate>,
}

impl Gateway {
    /// Create a new gateway
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the client certificate policy is
    /// incomplete or the header name is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let gate = Arc::new(RequestGate::from_config(&config.client_cert)?);

        info!(
            header = %gate.header(),
            subject = %gate.policy().subject(),
            issuer = %gate.policy().issuer_common_name(),
            thumbprint = %gate.policy().thumbprint(),
            algorithm = %config.client_cert.thumbprint_algorithm,
            "Client certificate gate configured"
        );

        Ok(Self { config, gate })
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let listener = TcpListener::bind(addr).await?;
        info!(address = %addr, "Listening");

        let app = create_router(Arc::clone(&self.gate));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
