//! End-to-end gate tests
//!
//! Drives the axum router with forwarded-certificate headers and checks:
//! - missing / undecodable / unparseable headers are refused with a bare 403
//! - a certificate matching the pin reaches the downstream stage exactly once
//! - a certificate failing any single policy check never reaches downstream

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use pretty_assertions::assert_eq;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, date_time_ymd};
use tower::ServiceExt;

use cert_gate::gateway::{RequestGate, create_router, create_router_with};
use cert_gate::mtls::{
    CertGenerator, CertificatePolicy, ClientCertConfig, ClientCertParams, ThumbprintAlgorithm,
    thumbprint,
};

const HEADER: &str = "X-ARR-ClientCert";

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// A self-signed client cert valid today, as DER.
fn client_cert(cn: &str) -> Vec<u8> {
    CertGenerator::self_signed_client(&ClientCertParams {
        cn,
        organization: Some("Example"),
        validity_days: 30,
    })
    .unwrap()
    .cert_der
}

/// A self-signed cert whose window ended in 2021.
fn expired_cert(cn: &str) -> Vec<u8> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.not_before = date_time_ymd(2020, 1, 1);
    params.not_after = date_time_ymd(2021, 1, 1);
    let key_pair = KeyPair::generate().unwrap();
    params.self_signed(&key_pair).unwrap().der().to_vec()
}

/// Gate pinned to `der` with the given subject/issuer components.
fn pinned_gate(der: &[u8], subject: &str, issuer: &str) -> Arc<RequestGate> {
    let policy = CertificatePolicy::new(
        subject,
        issuer,
        &thumbprint(der, ThumbprintAlgorithm::Sha1),
    );
    Arc::new(RequestGate::new(HEADER, policy, ThumbprintAlgorithm::Sha1).unwrap())
}

/// Downstream stage that counts invocations and answers 202.
fn counting_downstream(hits: Arc<AtomicUsize>) -> Router {
    Router::new().fallback(move || {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (StatusCode::ACCEPTED, "downstream says hi")
        }
    })
}

async fn send(app: Router, header: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri("/orders/42");
    if let Some(value) = header {
        builder = builder.header(HEADER, value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

/// Scenario A: header absent
#[tokio::test]
async fn test_missing_header_is_forbidden() {
    let der = client_cert("billing-agent");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = create_router_with(
        pinned_gate(&der, "CN=billing-agent", "CN=billing-agent"),
        counting_downstream(Arc::clone(&hits)),
    );

    let response = send(app, None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

/// Scenario B: header is not base64
#[tokio::test]
async fn test_invalid_base64_is_forbidden() {
    let der = client_cert("billing-agent");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = create_router_with(
        pinned_gate(&der, "CN=billing-agent", "CN=billing-agent"),
        counting_downstream(Arc::clone(&hits)),
    );

    let response = send(app, Some("%%%not-base64%%%")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

/// Scenario C: certificate passes every check
#[tokio::test]
async fn test_matching_cert_reaches_downstream_once() {
    let der = client_cert("billing-agent");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = create_router_with(
        pinned_gate(&der, "CN=billing-agent", "CN=billing-agent"),
        counting_downstream(Arc::clone(&hits)),
    );

    let response = send(app, Some(&STANDARD.encode(&der))).await;

    // Downstream's own status and body come back untouched
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_bytes(response).await, b"downstream says hi");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// Scenario D: subject, issuer and time match but the thumbprint does not
#[tokio::test]
async fn test_wrong_thumbprint_is_forbidden() {
    let pinned = client_cert("billing-agent");
    let impostor = client_cert("billing-agent");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = create_router_with(
        pinned_gate(&pinned, "CN=billing-agent", "CN=billing-agent"),
        counting_downstream(Arc::clone(&hits)),
    );

    let response = send(app, Some(&STANDARD.encode(&impostor))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Remaining rejection paths
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_base64_of_non_certificate_is_forbidden() {
    let der = client_cert("billing-agent");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = create_router_with(
        pinned_gate(&der, "CN=billing-agent", "CN=billing-agent"),
        counting_downstream(Arc::clone(&hits)),
    );

    let response = send(app, Some(&STANDARD.encode(b"hello world"))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_pinned_cert_is_forbidden() {
    // GIVEN: the pin matches exactly, but the certificate has expired
    let der = expired_cert("billing-agent");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = create_router_with(
        pinned_gate(&der, "CN=billing-agent", "CN=billing-agent"),
        counting_downstream(Arc::clone(&hits)),
    );

    let response = send(app, Some(&STANDARD.encode(&der))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_subject_and_issuer_mismatch_are_forbidden() {
    let der = client_cert("billing-agent");

    for (subject, issuer) in [
        ("CN=other-agent", "CN=billing-agent"),
        ("CN=billing-agent", "CN=Corporate Root CA"),
        // substring of the real component is not a match
        ("CN=billing", "CN=billing-agent"),
    ] {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = create_router_with(
            pinned_gate(&der, subject, issuer),
            counting_downstream(Arc::clone(&hits)),
        );

        let response = send(app, Some(&STANDARD.encode(&der))).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{subject} / {issuer}");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_every_rejection_looks_identical_to_the_caller() {
    let der = client_cert("billing-agent");
    let other = client_cert("billing-agent");
    let gate = pinned_gate(&der, "CN=billing-agent", "CN=billing-agent");

    let mut responses = Vec::new();
    for header in [
        None,
        Some("!!!".to_string()),
        Some(STANDARD.encode(b"junk")),
        Some(STANDARD.encode(&other)),
    ] {
        let app = create_router_with(Arc::clone(&gate), Router::new().fallback(|| async { "ok" }));
        let response = send(app, header.as_deref()).await;
        let status = response.status();
        let header_count = response.headers().len();
        responses.push((status, header_count, body_bytes(response).await));
    }

    // Same status, same headers, same (empty) body
    for r in &responses {
        assert_eq!(r.0, StatusCode::FORBIDDEN);
        assert!(r.2.is_empty());
    }
    assert!(responses.windows(2).all(|w| w[0] == w[1]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in router
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_is_outside_the_gate() {
    let der = client_cert("billing-agent");
    let app = create_router(pinned_gate(&der, "CN=billing-agent", "CN=billing-agent"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_default_downstream_requires_cert() {
    let der = client_cert("billing-agent");
    let gate = pinned_gate(&der, "CN=billing-agent", "CN=billing-agent");

    let denied = send(create_router(Arc::clone(&gate)), None).await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let allowed = send(create_router(gate), Some(&STANDARD.encode(&der))).await;
    assert_eq!(allowed.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(allowed).await).unwrap();
    assert_eq!(body["status"], "authorized");
}

#[tokio::test]
async fn test_gate_from_config_with_sha256_pin() {
    // GIVEN: config pinning a SHA-256 fingerprint in lowercase
    let der = client_cert("billing-agent");
    let config = ClientCertConfig {
        subject: "CN=billing-agent".to_string(),
        issuer_cn: "O=Example".to_string(),
        thumbprint: thumbprint(&der, ThumbprintAlgorithm::Sha256).to_lowercase(),
        thumbprint_algorithm: ThumbprintAlgorithm::Sha256,
        ..Default::default()
    };
    let gate = Arc::new(RequestGate::from_config(&config).unwrap());

    // WHEN: the proxy forwards the pinned certificate
    let response = send(create_router(gate), Some(&STANDARD.encode(&der))).await;

    // THEN: accepted
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_custom_header_name() {
    let der = client_cert("billing-agent");
    let policy = CertificatePolicy::new(
        "CN=billing-agent",
        "CN=billing-agent",
        &thumbprint(&der, ThumbprintAlgorithm::Sha1),
    );
    let gate = Arc::new(RequestGate::new("X-Client-Cert", policy, ThumbprintAlgorithm::Sha1).unwrap());

    // Certificate in the default header is ignored
    let response = send(create_router(Arc::clone(&gate)), Some(&STANDARD.encode(&der))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = create_router(gate)
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-client-cert", STANDARD.encode(&der))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
