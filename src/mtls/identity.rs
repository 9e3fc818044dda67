//! Forwarded certificate extraction.
//!
//! Turns the raw header value relayed by the proxy into a
//! [`ParsedCertificate`]: base64 → DER → the handful of fields the policy
//! looks at. Nothing here consults the policy.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha1::{Digest, Sha1};
use sha2::Sha256;
use thiserror::Error;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use x509_parser::time::ASN1Time;

use super::config::ThumbprintAlgorithm;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why a forwarded certificate could not be turned into a [`ParsedCertificate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The header is absent or blank.
    #[error("client certificate header is missing or empty")]
    MissingHeader,

    /// The header value is not valid base64.
    #[error("client certificate header is not valid base64: {0}")]
    DecodeFailure(String),

    /// The decoded bytes are not a parseable X.509 certificate.
    #[error("client certificate is not a valid X.509 certificate: {0}")]
    MalformedCertificate(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsed certificate
// ─────────────────────────────────────────────────────────────────────────────

/// The certificate fields the policy evaluates.
///
/// Only [`extract`] and [`ParsedCertificate::from_der`] produce one, and
/// only after a successful parse. The fields cannot be set from outside
/// the crate:
///
/// ```compile_fail
/// use cert_gate::mtls::ParsedCertificate;
///
/// let forged = ParsedCertificate {
///     not_before: chrono::Utc::now(),
///     not_after: chrono::Utc::now(),
///     subject_dn: "CN=agent".to_string(),
///     issuer_dn: "CN=agent".to_string(),
///     thumbprint: "AA".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCertificate {
    /// Start of the validity window (inclusive).
    pub(crate) not_before: DateTime<Utc>,
    /// End of the validity window (inclusive).
    pub(crate) not_after: DateTime<Utc>,
    /// Subject DN, comma-separated (`CN=agent, O=Example`).
    pub(crate) subject_dn: String,
    /// Issuer DN, comma-separated.
    pub(crate) issuer_dn: String,
    /// Uppercase hex digest of the DER encoding.
    pub(crate) thumbprint: String,
}

impl ParsedCertificate {
    /// Parse a DER-encoded certificate.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MalformedCertificate`] if the bytes are not a
    /// certificate or carry a validity time outside the representable range.
    pub fn from_der(der: &[u8], algorithm: ThumbprintAlgorithm) -> Result<Self, ExtractError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| ExtractError::MalformedCertificate(e.to_string()))?;

        let validity = cert.validity();

        Ok(Self {
            not_before: to_utc(validity.not_before)?,
            not_after: to_utc(validity.not_after)?,
            subject_dn: cert.subject().to_string(),
            issuer_dn: cert.issuer().to_string(),
            thumbprint: thumbprint(der, algorithm),
        })
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn subject_dn(&self) -> &str {
        &self.subject_dn
    }

    pub fn issuer_dn(&self) -> &str {
        &self.issuer_dn
    }

    /// Uppercase hex digest, in the algorithm the certificate was parsed with.
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Trimmed, non-empty subject DN components.
    pub fn subject_components(&self) -> impl Iterator<Item = &str> {
        dn_components(&self.subject_dn)
    }

    /// Trimmed, non-empty issuer DN components.
    pub fn issuer_components(&self) -> impl Iterator<Item = &str> {
        dn_components(&self.issuer_dn)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Decode and parse the value of the forwarded-certificate header.
///
/// Surrounding whitespace is ignored; a value that is blank after trimming
/// counts as missing.
pub fn extract(
    header_value: Option<&str>,
    algorithm: ThumbprintAlgorithm,
) -> Result<ParsedCertificate, ExtractError> {
    let value = header_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ExtractError::MissingHeader)?;

    let der = STANDARD
        .decode(value)
        .map_err(|e| ExtractError::DecodeFailure(e.to_string()))?;

    ParsedCertificate::from_der(&der, algorithm)
}

/// Split a DN string into its trimmed, non-empty components.
///
/// ```
/// use cert_gate::mtls::dn_components;
///
/// let parts: Vec<_> = dn_components("CN=agent, O=Example,, ").collect();
/// assert_eq!(parts, ["CN=agent", "O=Example"]);
/// ```
pub fn dn_components(dn: &str) -> impl Iterator<Item = &str> {
    dn.split(',').map(str::trim).filter(|c| !c.is_empty())
}

/// Uppercase hex digest of `der` using `algorithm`.
pub fn thumbprint(der: &[u8], algorithm: ThumbprintAlgorithm) -> String {
    match algorithm {
        ThumbprintAlgorithm::Sha1 => hex::encode_upper(Sha1::digest(der)),
        ThumbprintAlgorithm::Sha256 => hex::encode_upper(Sha256::digest(der)),
    }
}

fn to_utc(time: ASN1Time) -> Result<DateTime<Utc>, ExtractError> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or_else(|| {
        ExtractError::MalformedCertificate(format!("validity time out of range: {time}"))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
