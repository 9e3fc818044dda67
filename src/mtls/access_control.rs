//! Pinned-certificate policy evaluation.
//!
//! Four checks, evaluated in a fixed order; the first failure decides the
//! reason and the rest are skipped:
//!
//! 1. validity window (`not_before <= now <= not_after`)
//! 2. subject DN contains the configured component
//! 3. issuer DN contains the configured component
//! 4. thumbprint equals the pin (case-insensitive)
//!
//! There is no chain building and no revocation lookup. A self-signed
//! certificate passes as long as it matches the pin.

use std::fmt;

use chrono::{DateTime, Utc};

use super::config::CertificatePolicy;
use super::identity::{ParsedCertificate, dn_components};

// ─────────────────────────────────────────────────────────────────────────────
// Decision types
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of evaluating a certificate against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Every check passed.
    Accept,
    /// The first check that failed.
    Reject(RejectReason),
}

impl Decision {
    /// `true` for [`Decision::Accept`].
    pub fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Which policy check rejected the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// `now` lies outside `[not_before, not_after]`.
    ExpiredOrNotYetValid,
    /// No subject DN component equals the configured subject.
    SubjectMismatch,
    /// No issuer DN component equals the configured issuer.
    IssuerMismatch,
    /// Thumbprint differs from the pin.
    ThumbprintMismatch,
}

impl RejectReason {
    /// Stable snake-case label for structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpiredOrNotYetValid => "expired_or_not_yet_valid",
            Self::SubjectMismatch => "subject_mismatch",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::ThumbprintMismatch => "thumbprint_mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation
// ─────────────────────────────────────────────────────────────────────────────

/// Evaluate `cert` against `policy` at the current time.
pub fn validate(cert: &ParsedCertificate, policy: &CertificatePolicy) -> Decision {
    validate_at(cert, policy, Utc::now())
}

/// Evaluate `cert` against `policy` with `now` as the single clock sample.
pub fn validate_at(
    cert: &ParsedCertificate,
    policy: &CertificatePolicy,
    now: DateTime<Utc>,
) -> Decision {
    if now < cert.not_before || now > cert.not_after {
        return Decision::Reject(RejectReason::ExpiredOrNotYetValid);
    }

    if !has_component(&cert.subject_dn, policy.subject()) {
        return Decision::Reject(RejectReason::SubjectMismatch);
    }

    if !has_component(&cert.issuer_dn, policy.issuer_common_name()) {
        return Decision::Reject(RejectReason::IssuerMismatch);
    }

    if cert.thumbprint.trim().to_ascii_uppercase() != policy.thumbprint() {
        return Decision::Reject(RejectReason::ThumbprintMismatch);
    }

    Decision::Accept
}

/// Exact, case-sensitive equality against any trimmed DN component.
fn has_component(dn: &str, expected: &str) -> bool {
    dn_components(dn).any(|component| component == expected)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
