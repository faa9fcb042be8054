//! Referral-split orchestration against a stub Open Payments server.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use open_payments::{OpenPaymentsClient, SigningConfig};
use serde_json::{json, Value};
use storefront_server::{errors::ServerError, referral::build_referral_split, store::Product};
use tempfile::TempDir;

fn test_signing_config(dir: &TempDir) -> SigningConfig {
    use ed25519_dalek::pkcs8::EncodePrivateKey;
    let key = ed25519_dalek::SigningKey::from_bytes(&[9u8; 32]);
    let pem = key.to_pkcs8_pem(Default::default()).expect("Failed to encode test key");
    let path = dir.path().join("key.pem");
    std::fs::write(&path, pem.as_bytes()).expect("Failed to write test key");
    SigningConfig::new("https://ilp.example/shop", path, "test-key")
}

fn own_base(req: &HttpRequest) -> String {
    format!("http://{}", req.app_config().local_addr())
}

async fn wallet_doc(req: HttpRequest) -> HttpResponse {
    let base = own_base(&req);
    let name = req.match_info().get("name").unwrap_or_default().to_string();
    HttpResponse::Ok().json(json!({
        "id": format!("{base}/{name}"),
        "assetCode": "USD",
        "assetScale": 2,
        "authServer": format!("{base}/auth"),
        "resourceServer": format!("{base}/rs"),
    }))
}

/// A grant that finalizes on the spot, as incoming-payment grants do.
async fn finalized_grant(req: HttpRequest) -> HttpResponse {
    let base = own_base(&req);
    HttpResponse::Ok().json(json!({
        "access_token": {"value": "inc-tok", "manage": format!("{base}/auth/token/1")}
    }))
}

/// Echoes the requested amount back in the payment id so the test can tell the two sides apart.
async fn create_incoming_payment(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    let base = own_base(&req);
    let value = body["incomingAmount"]["value"].as_str().unwrap_or_default().to_string();
    HttpResponse::Ok().json(json!({
        "id": format!("{base}/rs/incoming-payments/{value}"),
        "walletAddress": body["walletAddress"],
        "incomingAmount": body["incomingAmount"],
        "completed": false,
    }))
}

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

fn product(base: &str, price: f64) -> Product {
    Product {
        id: 7,
        seller_wallet_address: format!("{base}/seller"),
        title: "Widget".into(),
        description: "A fine widget".into(),
        price,
        image: None,
    }
}

#[actix_web::test]
async fn referral_split_provisions_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let signing = test_signing_config(&dir);
    let base = spawn_stub!(|| {
        App::new()
            .route("/auth", web::post().to(finalized_grant))
            .route("/rs/incoming-payments", web::post().to(create_incoming_payment))
            .route("/{name}", web::get().to(wallet_doc))
    });

    let client = OpenPaymentsClient::new();
    let split = build_referral_split(&client, &signing, &product(&base, 10.0), &format!("{base}/referrer"))
        .await
        .expect("Referral split failed");

    // 10.00 USD at scale 2 splits 950 / 50.
    assert_eq!(split.total.value(), 1000);
    assert_eq!(split.seller_amount.value, "950");
    assert_eq!(split.referral_amount.value, "50");
    assert_eq!(split.seller_amount.asset_code, "USD");
    assert!(split.seller_payment.id.ends_with("/incoming-payments/950"));
    assert!(split.referral_payment.id.ends_with("/incoming-payments/50"));
    assert!(split.seller_links.web_link.contains("amount=950"));
    assert!(split.referral_links.web_link.contains("amount=50"));
    assert!(split.seller_links.web_link.starts_with("https://pay.interledger-test.dev/payment-choice?"));
}

#[actix_web::test]
async fn tiny_price_with_empty_share_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let signing = test_signing_config(&dir);
    let base = spawn_stub!(|| App::new().route("/{name}", web::get().to(wallet_doc)));

    // 0.01 USD -> 1 minor unit -> seller share floors to zero.
    let client = OpenPaymentsClient::new();
    let err = build_referral_split(&client, &signing, &product(&base, 0.01), &format!("{base}/referrer"))
        .await
        .expect_err("A split with an empty share must be rejected");
    assert!(matches!(err, ServerError::InvalidRequest(_)));
}

#[actix_web::test]
async fn mismatched_assets_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let signing = test_signing_config(&dir);
    let base = spawn_stub!(|| {
        App::new()
            .route(
                "/referrer",
                web::get().to(|req: HttpRequest| async move {
                    let base = own_base(&req);
                    HttpResponse::Ok().json(json!({
                        "id": format!("{base}/referrer"),
                        "assetCode": "EUR",
                        "assetScale": 2,
                        "authServer": format!("{base}/auth"),
                        "resourceServer": format!("{base}/rs"),
                    }))
                }),
            )
            .route("/{name}", web::get().to(wallet_doc))
    });

    let client = OpenPaymentsClient::new();
    let err = build_referral_split(&client, &signing, &product(&base, 10.0), &format!("{base}/referrer"))
        .await
        .expect_err("Mismatched assets must be rejected");
    assert!(matches!(err, ServerError::InvalidRequest(_)));
}

#[actix_web::test]
async fn pending_grant_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let signing = test_signing_config(&dir);
    let base = spawn_stub!(|| {
        App::new()
            .route(
                "/auth",
                web::post().to(|req: HttpRequest| async move {
                    let base = own_base(&req);
                    HttpResponse::Ok().json(json!({
                        "continue": {
                            "uri": format!("{base}/auth/continue/1"),
                            "access_token": {"value": "cont"}
                        },
                        "interact": {"redirect": format!("{base}/auth/interact/1")}
                    }))
                }),
            )
            .route("/{name}", web::get().to(wallet_doc))
    });

    let client = OpenPaymentsClient::new();
    let err = build_referral_split(&client, &signing, &product(&base, 10.0), &format!("{base}/referrer"))
        .await
        .expect_err("A pending grant must surface as a conflict");
    assert!(matches!(err, ServerError::GrantPending { .. }));
}
