//! Forwarded client-certificate configuration types.
//!
//! # Example YAML
//!
//! ```yaml
//! client_cert:
//!   header: "X-ARR-ClientCert"
//!   subject: "CN=billing-agent"
//!   issuer_cn: "CN=billing-agent"
//!   thumbprint: "3A1F0C9E5B7D2A4C6E8F0A1B2C3D4E5F60718293"
//!   thumbprint_algorithm: sha1
//! ```
//!
//! `subject` and `issuer_cn` are compared against whole DN components, so
//! they must carry the attribute prefix (`CN=`, `O=`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CERT_HEADER, Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Config block
// ─────────────────────────────────────────────────────────────────────────────

/// The `client_cert` configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientCertConfig {
    /// Header the upstream proxy forwards the base64 DER certificate in.
    pub header: String,

    /// DN component the certificate subject must contain (e.g. `CN=agent`).
    pub subject: String,

    /// DN component the certificate issuer must contain.
    #[serde(alias = "issuerCN", alias = "issuer_common_name")]
    pub issuer_cn: String,

    /// Pinned certificate thumbprint (hex, any case).
    pub thumbprint: String,

    /// Digest used to compute certificate thumbprints.
    pub thumbprint_algorithm: ThumbprintAlgorithm,
}

impl Default for ClientCertConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_CERT_HEADER.to_string(),
            subject: String::new(),
            issuer_cn: String::new(),
            thumbprint: String::new(),
            thumbprint_algorithm: ThumbprintAlgorithm::default(),
        }
    }
}

impl ClientCertConfig {
    /// Build the immutable policy this block describes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any of subject, issuer or thumbprint is
    /// blank, or the thumbprint has embedded whitespace.
    pub fn policy(&self) -> Result<CertificatePolicy> {
        let subject = self.subject.trim();
        let issuer = self.issuer_cn.trim();
        let thumbprint = self.thumbprint.trim();

        if subject.is_empty() {
            return Err(Error::Config("client_cert.subject must not be empty".into()));
        }
        if issuer.is_empty() {
            return Err(Error::Config("client_cert.issuer_cn must not be empty".into()));
        }
        if thumbprint.is_empty() {
            return Err(Error::Config("client_cert.thumbprint must not be empty".into()));
        }
        if thumbprint.chars().any(char::is_whitespace) {
            return Err(Error::Config(
                "client_cert.thumbprint must not contain embedded whitespace".into(),
            ));
        }

        Ok(CertificatePolicy::new(subject, issuer, thumbprint))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

/// The pinned-certificate allow-list evaluated for every request.
///
/// Construct once at startup and share behind an `Arc`; it is never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePolicy {
    subject: String,
    issuer_common_name: String,
    thumbprint: String,
}

impl CertificatePolicy {
    /// Create a policy. The thumbprint is trimmed and stored uppercase.
    pub fn new(
        subject: impl Into<String>,
        issuer_common_name: impl Into<String>,
        thumbprint: &str,
    ) -> Self {
        Self {
            subject: subject.into(),
            issuer_common_name: issuer_common_name.into(),
            thumbprint: thumbprint.trim().to_ascii_uppercase(),
        }
    }

    /// Required subject DN component.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Required issuer DN component.
    pub fn issuer_common_name(&self) -> &str {
        &self.issuer_common_name
    }

    /// Pinned thumbprint, uppercase.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Thumbprint algorithm
// ─────────────────────────────────────────────────────────────────────────────

/// Digest over the DER bytes used as the certificate thumbprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbprintAlgorithm {
    /// SHA-1, the conventional X.509 thumbprint (40 hex chars).
    #[default]
    Sha1,
    /// SHA-256 fingerprint (64 hex chars).
    Sha256,
}

impl fmt::Display for ThumbprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
