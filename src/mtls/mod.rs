//! Forwarded client-certificate authentication.
//!
//! A TLS-terminating proxy (IIS ARR, nginx, an ingress) negotiates the
//! client certificate and relays it as base64 DER in a request header.
//! This module decodes that header and checks the certificate against a
//! single pinned identity.
//!
//! # Architecture
//!
//! ```text
//! header value
//!   → identity::extract        MissingHeader | DecodeFailure | MalformedCertificate
//!   → ParsedCertificate        validity window, subject DN, issuer DN, thumbprint
//!   → access_control::validate Accept | Reject(reason)
//! ```
//!
//! # Modules
//!
//! - [`config`]: `client_cert` configuration and the immutable [`CertificatePolicy`]
//! - [`identity`]: header decoding and X.509 field extraction
//! - [`access_control`]: policy evaluation ([`Decision`], [`RejectReason`])
//! - [`cert_manager`]: operator tooling to inspect and generate certificates

pub mod access_control;
pub mod cert_manager;
pub mod config;
pub mod identity;

pub use access_control::{Decision, RejectReason, validate, validate_at};
pub use cert_manager::{
    CertGenerator, CertReport, ClientCertParams, GeneratedCert, inspect, load_certificate,
};
pub use config::{CertificatePolicy, ClientCertConfig, ThumbprintAlgorithm};
pub use identity::{ExtractError, ParsedCertificate, dn_components, extract, thumbprint};
