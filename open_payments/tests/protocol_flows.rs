//! End-to-end protocol flows against stub HTTP servers bound to an ephemeral local port.

use std::{path::PathBuf, sync::Mutex};

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use open_payments::{Grant, OpenPaymentsClient, OpenPaymentsError, RequestOptions, SigningConfig};
use serde_json::json;
use sha2::{Digest, Sha512};
use tempfile::TempDir;

type Captured = web::Data<Mutex<Vec<(String, String)>>>;

/// Bind the given app factory to an ephemeral local port and return the base URL. The server is dropped with
/// the test's runtime.
macro_rules! spawn_stub {
    ($factory:expr) => {{
        let server = HttpServer::new($factory)
            .workers(1)
            .bind(("127.0.0.1", 0))
            .expect("Failed to bind stub server");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }};
}

/// Write a fresh Ed25519 PKCS#8 PEM key into `dir` and return a signing config pointing at it.
fn test_signing_config(dir: &TempDir) -> SigningConfig {
    use ed25519_dalek::pkcs8::EncodePrivateKey;
    let key = ed25519_dalek::SigningKey::from_bytes(&[42u8; 32]);
    let pem = key.to_pkcs8_pem(Default::default()).expect("Failed to encode test key");
    let path: PathBuf = dir.path().join("key.pem");
    std::fs::write(&path, pem.as_bytes()).expect("Failed to write test key");
    SigningConfig::new("https://ilp.example/shop", path, "test-key-1")
}

fn header<'a>(captured: &'a [(String, String)], name: &str) -> Option<&'a str> {
    captured.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

async fn capture_and_ok(req: HttpRequest, _body: web::Bytes, captured: Captured) -> HttpResponse {
    let mut lock = captured.lock().unwrap();
    *lock = req
        .headers()
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    HttpResponse::Ok().json(json!({"ok": true}))
}

#[actix_web::test]
async fn signed_post_carries_gnap_token_and_signature_headers() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_signing_config(&dir);
    let captured: Captured = web::Data::new(Mutex::new(Vec::new()));
    let state = captured.clone();
    let base = spawn_stub!(move || {
        App::new().app_data(state.clone()).route("/incoming-payments", web::post().to(capture_and_ok))
    });

    let client = OpenPaymentsClient::new();
    let body = json!({"walletAddress": "https://ilp.example/alice"});
    let expected_digest = format!("sha-512=:{}:", BASE64.encode(Sha512::digest(body.to_string().as_bytes())));
    let options = RequestOptions { access_token: Some("tok-1"), config: Some(&config), sign: None };
    client
        .post(&format!("{base}/incoming-payments"), body, options)
        .await
        .expect("Signed POST failed");

    let captured = captured.lock().unwrap();
    assert_eq!(header(&captured, "authorization"), Some("GNAP tok-1"));
    assert_eq!(header(&captured, "content-digest"), Some(expected_digest.as_str()));
    let input = header(&captured, "signature-input").expect("No Signature-Input header");
    assert!(input.starts_with("sig1=(\"@method\" \"@target-uri\" \"authorization\""));
    assert!(input.ends_with(";keyid=\"test-key-1\""));
    assert!(header(&captured, "signature").unwrap().starts_with("sig1=:"));
}

#[actix_web::test]
async fn plain_get_is_unsigned() {
    let captured: Captured = web::Data::new(Mutex::new(Vec::new()));
    let state = captured.clone();
    let base = spawn_stub!(move || {
        App::new().app_data(state.clone()).route("/wallet", web::get().to(capture_and_ok))
    });

    let client = OpenPaymentsClient::new();
    client.get(&format!("{base}/wallet"), RequestOptions::default()).await.expect("GET failed");

    let captured = captured.lock().unwrap();
    assert_eq!(header(&captured, "signature"), None);
    assert_eq!(header(&captured, "signature-input"), None);
    assert_eq!(header(&captured, "accept"), Some("application/json"));
}

#[actix_web::test]
async fn incoming_payment_grant_finalizes_without_interaction() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_signing_config(&dir);
    let base = spawn_stub!(|| {
        App::new().route(
            "/",
            web::post().to(|| async {
                HttpResponse::Ok().json(json!({
                    "access_token": {"value": "abc", "manage": "https://as.example/token/1"}
                }))
            }),
        )
    });

    let client = OpenPaymentsClient::new();
    let grant = client.request_incoming_payment_grant(&base, &config).await.expect("Grant request failed");
    let finalized = grant.into_finalized().expect("Grant should have finalized immediately");
    assert_eq!(finalized.access_token.value, "abc");
}

#[actix_web::test]
async fn outgoing_grant_is_pending_then_continues_to_finalized() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_signing_config(&dir);
    let base = spawn_stub!(|| {
        App::new()
            .route(
                "/",
                web::post().to(|req: HttpRequest| async move {
                    let own = format!("http://{}", req.app_config().local_addr());
                    HttpResponse::Ok().json(json!({
                        "continue": {
                            "uri": format!("{own}/continue/77"),
                            "access_token": {"value": "cont-tok"}
                        },
                        "interact": {"redirect": "https://as.example/interact/77"}
                    }))
                }),
            )
            .route(
                "/continue/77",
                web::post().to(|req: HttpRequest| async move {
                    // The continuation token authorizes this call.
                    let auth = req.headers().get("authorization").and_then(|v| v.to_str().ok());
                    if auth != Some("GNAP cont-tok") {
                        return HttpResponse::Unauthorized().finish();
                    }
                    HttpResponse::Ok().json(json!({"access_token": {"value": "final-1"}}))
                }),
            )
    });

    let client = OpenPaymentsClient::new();
    let amount = op_common::Amount::new(op_common::MinorUnits::from(1000), "USD", 2);
    let grant = client
        .request_outgoing_payment_grant(&base, "https://ilp.example/buyer", amount, &config, true)
        .await
        .expect("Grant request failed");
    let pending = match grant {
        Grant::Pending(pending) => pending,
        Grant::Finalized(_) => panic!("Interactive outgoing grant should start pending"),
    };
    assert_eq!(pending.interact.as_ref().unwrap().redirect, "https://as.example/interact/77");

    let finalized = client
        .continue_grant(&pending.continuation.uri, &pending.continuation.access_token.value, &config)
        .await
        .expect("Continuation failed");
    assert_eq!(finalized.access_token.value, "final-1");
}

#[actix_web::test]
async fn continuation_that_stays_pending_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_signing_config(&dir);
    let base = spawn_stub!(|| {
        App::new().route(
            "/continue/1",
            web::post().to(|| async {
                HttpResponse::Ok().json(json!({
                    "continue": {"uri": "https://as.example/continue/1", "access_token": {"value": "c2"}}
                }))
            }),
        )
    });

    let client = OpenPaymentsClient::new();
    let err = client
        .continue_grant(&format!("{base}/continue/1"), "cont-tok", &config)
        .await
        .expect_err("A still-pending continuation must not succeed");
    assert!(matches!(err, OpenPaymentsError::GrantNotFinalized));
}

#[actix_web::test]
async fn wallet_batch_validation_never_fails_the_batch() {
    let base = spawn_stub!(|| {
        App::new()
            .route(
                "/alice",
                web::get().to(|req: HttpRequest| async move {
                    let base = format!("http://{}", req.app_config().local_addr());
                    HttpResponse::Ok().json(json!({
                        "id": format!("{base}/alice"),
                        "assetCode": "USD",
                        "assetScale": 2,
                        "authServer": "https://as.example",
                        "resourceServer": "https://rs.example"
                    }))
                }),
            )
            .route(
                "/bob",
                web::get().to(|req: HttpRequest| async move {
                    let base = format!("http://{}", req.app_config().local_addr());
                    HttpResponse::Ok().json(json!({
                        "id": format!("{base}/bob"),
                        "assetCode": "EUR",
                        "assetScale": 2,
                        "authServer": "https://as.example",
                        "resourceServer": "https://rs.example"
                    }))
                }),
            )
    });

    let client = OpenPaymentsClient::new();
    let urls = vec![format!("{base}/alice"), format!("{base}/missing"), format!("{base}/bob")];
    let checks = client.validate_wallet_addresses(&urls).await;

    assert_eq!(checks.len(), 3);
    assert_eq!(checks[0].url, urls[0]);
    assert!(checks[0].is_valid());
    assert!(!checks[1].is_valid());
    assert_eq!(checks[1].result.as_ref().unwrap_err().status(), Some(404));
    assert!(checks[2].is_valid());
    assert_eq!(checks[2].result.as_ref().unwrap().asset_code, "EUR");
}

#[actix_web::test]
async fn remote_rejections_carry_status_and_body() {
    let base = spawn_stub!(|| {
        App::new().route(
            "/quotes",
            web::post().to(|| async { HttpResponse::BadRequest().json(json!({"error": "invalid receiver"})) }),
        )
    });

    let client = OpenPaymentsClient::new();
    // Signing is forced off so the request reaches the stub without a key; the rejection is what is under test.
    let options = RequestOptions { access_token: None, config: None, sign: Some(false) };
    let err = client
        .post(&format!("{base}/quotes"), json!({"receiver": "nope"}), options)
        .await
        .expect_err("A 400 must surface as an error");
    assert_eq!(err.status(), Some(400));
    assert!(err.is_client_error());
    assert!(err.to_string().contains("invalid receiver"));
}

#[actix_web::test]
async fn unsigned_post_without_a_config_is_a_usage_error() {
    let client = OpenPaymentsClient::new();
    // A POST with no token, no config and no override must refuse to leave unsigned.
    let err = client
        .post("https://as.example/", json!({}), RequestOptions::default())
        .await
        .expect_err("A POST without signing material must fail before the network");
    assert!(matches!(err, OpenPaymentsError::SigningConfigMissing));
    assert_eq!(err.status(), None);
}
