//! Certificate tooling for operators.
//!
//! Provides:
//! - [`load_certificate`]: read a PEM or DER certificate file
//! - [`inspect`]: the values to put in `client_cert` config for a given certificate
//! - [`CertGenerator`]: `rcgen`-backed self-signed client certificates for pinning

use std::fs;
use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Datelike, Duration, Utc};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, date_time_ymd};
use serde::Serialize;
use x509_parser::pem::parse_x509_pem;

use super::config::ThumbprintAlgorithm;
use super::identity::ParsedCertificate;
use crate::{Error, Result};

const PEM_CERT_MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";

// ─────────────────────────────────────────────────────────────────────────────
// Public: loading and inspection
// ─────────────────────────────────────────────────────────────────────────────

/// Read a certificate file and return its DER bytes.
///
/// PEM is detected by its `BEGIN CERTIFICATE` marker; anything else is
/// treated as raw DER.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the PEM block is invalid.
pub fn load_certificate(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path)
        .map_err(|e| Error::Certificate(format!("Cannot read '{}': {e}", path.display())))?;

    if data
        .windows(PEM_CERT_MARKER.len())
        .any(|w| w == PEM_CERT_MARKER)
    {
        let (_, pem) = parse_x509_pem(&data).map_err(|e| {
            Error::Certificate(format!("Failed to parse PEM from '{}': {e}", path.display()))
        })?;
        Ok(pem.contents)
    } else {
        Ok(data)
    }
}

/// What an operator needs to configure a pin for one certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertReport {
    /// Parsed fields, including the thumbprint.
    #[serde(flatten)]
    pub certificate: ParsedCertificate,
    /// Digest the thumbprint was computed with.
    pub thumbprint_algorithm: ThumbprintAlgorithm,
    /// The header value an upstream proxy would forward for this certificate.
    pub header_value: String,
}

/// Parse `der` and build a [`CertReport`].
///
/// # Errors
///
/// Returns an error if `der` is not a valid certificate.
pub fn inspect(der: &[u8], algorithm: ThumbprintAlgorithm) -> Result<CertReport> {
    let certificate =
        ParsedCertificate::from_der(der, algorithm).map_err(|e| Error::Certificate(e.to_string()))?;

    Ok(CertReport {
        certificate,
        thumbprint_algorithm: algorithm,
        header_value: STANDARD.encode(der),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: certificate generation (CLI helpers)
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for a self-signed client certificate.
#[derive(Debug)]
pub struct ClientCertParams<'a> {
    /// Common Name.
    pub cn: &'a str,
    /// Organisation (optional).
    pub organization: Option<&'a str>,
    /// Validity period in days, starting today.
    pub validity_days: u32,
}

/// Generated certificate and key pair.
#[derive(Debug)]
pub struct GeneratedCert {
    /// PEM-encoded certificate.
    pub cert_pem: String,
    /// PEM-encoded private key.
    pub key_pem: String,
    /// DER-encoded certificate.
    pub cert_der: Vec<u8>,
}

/// Certificate generator backed by `rcgen`.
pub struct CertGenerator;

impl CertGenerator {
    /// Generate a self-signed client certificate.
    ///
    /// Subject and issuer are identical, so the policy's `subject` and
    /// `issuer_cn` are both `CN=<cn>`.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or certificate serialisation fails.
    pub fn self_signed_client(params: &ClientCertParams<'_>) -> Result<GeneratedCert> {
        let key_pair = KeyPair::generate()
            .map_err(|e| Error::Certificate(format!("Failed to generate key: {e}")))?;

        let mut cert_params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, params.cn);
        if let Some(org) = params.organization {
            dn.push(DnType::OrganizationName, org);
        }
        cert_params.distinguished_name = dn;

        let today = Utc::now();
        cert_params.not_before = to_rcgen_date(today)?;
        cert_params.not_after =
            to_rcgen_date(today + Duration::days(i64::from(params.validity_days)))?;

        let cert = cert_params
            .self_signed(&key_pair)
            .map_err(|e| Error::Certificate(format!("Certificate generation failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
            cert_der: cert.der().to_vec(),
        })
    }

    /// Write a [`GeneratedCert`] to disk as `<stem>.crt` and `<stem>.key` under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the files
    /// cannot be written.
    pub fn write_to_dir(cert: &GeneratedCert, dir: &Path, stem: &str) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| {
            Error::Certificate(format!("Cannot create dir '{}': {e}", dir.display()))
        })?;

        fs::write(dir.join(format!("{stem}.crt")), &cert.cert_pem)
            .map_err(|e| Error::Certificate(format!("Cannot write cert: {e}")))?;

        fs::write(dir.join(format!("{stem}.key")), &cert.key_pem)
            .map_err(|e| Error::Certificate(format!("Cannot write key: {e}")))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Private helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Midnight UTC of `at`'s calendar day, in rcgen's date representation.
fn to_rcgen_date(at: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    let month = u8::try_from(at.month())
        .map_err(|e| Error::Certificate(format!("Date calculation error: {e}")))?;
    let day = u8::try_from(at.day())
        .map_err(|e| Error::Certificate(format!("Date calculation error: {e}")))?;
    Ok(date_time_ymd(at.year(), month, day))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
