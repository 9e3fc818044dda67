//! Forwarded client-certificate gate
//!
//! Authenticates HTTP callers by an X.509 client certificate that an
//! upstream TLS-terminating proxy relays in a request header (IIS ARR's
//! `X-ARR-ClientCert` by default) instead of presenting it on the TLS
//! connection itself.
//!
//! # Pipeline
//!
//! ```text
//! request
//!   → RequestGate reads the forwarded-certificate header
//!   → mtls::extract         base64 → DER → ParsedCertificate
//!   → mtls::validate        time window, subject, issuer, thumbprint pin
//!   → Accept: next stage    Reject / extract failure: 403, empty body
//! ```
//!
//! The policy pins a single leaf certificate. There is deliberately no
//! chain-of-trust or revocation check.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mtls;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default header an upstream proxy forwards the client certificate in
pub const DEFAULT_CERT_HEADER: &str = "X-ARR-ClientCert";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))?,
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))?,
    }

    Ok(())
}
