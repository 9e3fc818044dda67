//! Forwarded client-certificate gate middleware
//!
//! Every failure, whether the header is missing, undecodable, unparseable or
//! rejected by the policy, produces the same bare `403 Forbidden`. The
//! reason only reaches the logs.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::mtls::{
    CertificatePolicy, ClientCertConfig, Decision, ExtractError, RejectReason,
    ThumbprintAlgorithm, extract, validate,
};
use crate::{Error, Result};

/// Why the gate refused a request. Never sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateDenial {
    /// The forwarded certificate could not be extracted.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The certificate was parsed but failed the policy.
    #[error("client certificate rejected: {0}")]
    Policy(RejectReason),

    /// Evaluating the certificate panicked.
    #[error("client certificate check panicked")]
    Panicked,
}

/// The request gate: header name, pinned policy and thumbprint digest.
///
/// Immutable after construction and shared behind an `Arc` by every
/// request.
#[derive(Debug, Clone)]
pub struct RequestGate {
    header: HeaderName,
    policy: CertificatePolicy,
    algorithm: ThumbprintAlgorithm,
}

impl RequestGate {
    /// Create a gate reading the certificate from `header`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `header` is not a valid HTTP header name.
    pub fn new(
        header: &str,
        policy: CertificatePolicy,
        algorithm: ThumbprintAlgorithm,
    ) -> Result<Self> {
        let header = HeaderName::try_from(header)
            .map_err(|e| Error::Config(format!("Invalid client_cert.header '{header}': {e}")))?;

        Ok(Self {
            header,
            policy,
            algorithm,
        })
    }

    /// Build a gate from the `client_cert` configuration block.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the policy is incomplete or the header
    /// name is invalid.
    pub fn from_config(config: &ClientCertConfig) -> Result<Self> {
        Self::new(&config.header, config.policy()?, config.thumbprint_algorithm)
    }

    /// Header the certificate is read from.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// The pinned policy.
    pub fn policy(&self) -> &CertificatePolicy {
        &self.policy
    }

    /// Decide whether a request carrying `headers` may proceed.
    ///
    /// Logs the outcome; the returned denial is for callers that want the
    /// reason programmatically.
    pub fn check(&self, headers: &HeaderMap) -> std::result::Result<(), GateDenial> {
        let cert = match self.header_value(headers).and_then(|v| extract(v, self.algorithm)) {
            Ok(cert) => cert,
            Err(ExtractError::MissingHeader) => {
                debug!(header = %self.header, "Client certificate header missing");
                return Err(ExtractError::MissingHeader.into());
            }
            Err(e) => {
                error!(header = %self.header, error = %e, "Failed to read client certificate");
                return Err(e.into());
            }
        };

        match validate(&cert, &self.policy) {
            Decision::Accept => {
                debug!(subject = %cert.subject_dn, "Client certificate accepted");
                Ok(())
            }
            Decision::Reject(reason) => {
                debug!(
                    reason = %reason,
                    subject = %cert.subject_dn,
                    issuer = %cert.issuer_dn,
                    not_before = %cert.not_before,
                    not_after = %cert.not_after,
                    "Client certificate failed policy check"
                );
                info!(
                    reason = %reason,
                    thumbprint = %cert.thumbprint,
                    "Rejected client certificate"
                );
                Err(GateDenial::Policy(reason))
            }
        }
    }

    fn header_value<'a>(
        &self,
        headers: &'a HeaderMap,
    ) -> std::result::Result<Option<&'a str>, ExtractError> {
        headers
            .get(&self.header)
            .map(|v| {
                v.to_str()
                    .map_err(|e| ExtractError::DecodeFailure(e.to_string()))
            })
            .transpose()
    }
}

/// Client-certificate middleware
///
/// On acceptance the request is forwarded untouched and the downstream
/// response is returned as-is.
pub async fn client_cert_middleware(
    State(gate): State<Arc<RequestGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match fail_closed(|| gate.check(request.headers())) {
        Ok(()) => next.run(request).await,
        Err(_) => forbidden_response(),
    }
}

/// Run a gate check, turning a panic into a denial.
fn fail_closed<F>(check: F) -> std::result::Result<(), GateDenial>
where
    F: FnOnce() -> std::result::Result<(), GateDenial>,
{
    catch_unwind(AssertUnwindSafe(check)).unwrap_or_else(|_| {
        error!("Client certificate check panicked");
        Err(GateDenial::Panicked)
    })
}

/// Create a bare 403 Forbidden response
fn forbidden_response() -> Response {
    StatusCode::FORBIDDEN.into_response()
}
