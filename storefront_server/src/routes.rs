//! Request handler definitions.
//!
//! Handlers stay thin: unpack the payload, call the client or a store, shape the JSON response. Anything with
//! real orchestration logic lives in its own module (`referral`, `checkout`).

use actix_web::{delete, get, post, web, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use open_payments::{Grant, NewIncomingPayment, NewOutgoingPayment, NewQuote, PaymentLinks};
use serde_json::{json, Value};

use crate::{
    data_objects::{
        AddProduct,
        ContinueParams,
        CreateIncomingPaymentParams,
        CreateOutgoingPaymentParams,
        CreateQuoteParams,
        FixedQuoteParams,
        GrantParams,
        IncomingPaymentRef,
        ListPaymentsParams,
        OutgoingGrantParams,
        OutgoingPaymentRef,
        PaymentLinkParams,
        ProductSearch,
        QuoteRef,
        ReferralWebhookQuery,
        RevokeGrantParams,
        TokenParams,
        WalletBatch,
        WalletLookup,
    },
    errors::ServerError,
    server::AppState,
};

fn grant_json(grant: &Grant) -> Value {
    match grant {
        Grant::Finalized(g) => json!({"isFinalized": true, "grant": g}),
        Grant::Pending(g) => json!({"isFinalized": false, "grant": g}),
    }
}

//--------------------------------------     Health & info       -----------------------------------------------------

#[get("/api/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/api/info")]
pub async fn info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Open Payments storefront gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "wallet": state.signing.wallet_address_url,
        "endpoints": {
            "walletAddress": ["POST /api/wallet/info", "POST /api/wallet/keys", "POST /api/wallet/validate"],
            "grants": [
                "POST /api/grants/incoming-payment",
                "POST /api/grants/quote",
                "POST /api/grants/outgoing-payment",
                "POST /api/grants/continue",
                "DELETE /api/grants/revoke"
            ],
            "incomingPayments": [
                "POST /api/incoming-payments",
                "POST /api/incoming-payments/get",
                "POST /api/incoming-payments/list",
                "POST /api/incoming-payments/complete"
            ],
            "quotes": [
                "POST /api/quotes",
                "POST /api/quotes/get",
                "POST /api/quotes/fixed-send",
                "POST /api/quotes/fixed-receive"
            ],
            "outgoingPayments": [
                "POST /api/outgoing-payments",
                "POST /api/outgoing-payments/get",
                "POST /api/outgoing-payments/list"
            ],
            "tokens": ["POST /api/tokens/rotate", "DELETE /api/tokens/revoke"],
            "products": ["POST /api/products", "POST /api/products/add", "GET /api/products/{id}"],
            "referral": ["GET /api/referral/webhook", "GET /api/referral/link"],
            "payment": ["POST /api/payment", "POST /api/payment-link"],
        }
    }))
}

//--------------------------------------     Product catalog       ---------------------------------------------------

#[post("/api/products")]
pub async fn search_products(
    state: web::Data<AppState>,
    params: web::Json<ProductSearch>,
) -> Result<HttpResponse, ServerError> {
    let products = state.catalog.search(&params.query)?;
    Ok(HttpResponse::Ok().json(products))
}

#[post("/api/products/add")]
pub async fn add_product(
    state: web::Data<AppState>,
    params: web::Json<AddProduct>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    if params.product.price <= 0.0 {
        return Err(ServerError::InvalidRequest("Product price must be a positive number".into()));
    }
    let product = state.catalog.add(params.product)?;
    info!("Added product #{} ({})", product.id, product.title);
    Ok(HttpResponse::Ok().json(json!({"success": true, "data": product})))
}

#[get("/api/products/{id}")]
pub async fn get_product(
    state: web::Data<AppState>,
    id: web::Path<u64>,
) -> Result<HttpResponse, ServerError> {
    let id = id.into_inner();
    let product =
        state.catalog.get(id)?.ok_or_else(|| ServerError::NotFound(format!("Product with id {id} not found")))?;
    Ok(HttpResponse::Ok().json(product))
}

//--------------------------------------     Wallet addresses       --------------------------------------------------

#[post("/api/wallet/info")]
pub async fn wallet_info(
    state: web::Data<AppState>,
    params: web::Json<WalletLookup>,
) -> Result<HttpResponse, ServerError> {
    let wallet = state.client.get_wallet_address(&params.wallet_address_url).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

#[post("/api/wallet/keys")]
pub async fn wallet_keys(
    state: web::Data<AppState>,
    params: web::Json<WalletLookup>,
) -> Result<HttpResponse, ServerError> {
    let keys = state.client.get_wallet_address_keys(&params.wallet_address_url).await?;
    Ok(HttpResponse::Ok().json(keys))
}

#[post("/api/wallet/validate")]
pub async fn wallet_validate(
    state: web::Data<AppState>,
    params: web::Json<WalletBatch>,
) -> Result<HttpResponse, ServerError> {
    let checks = state.client.validate_wallet_addresses(&params.wallet_addresses).await;
    let results: Vec<Value> = checks
        .into_iter()
        .map(|check| match check.result {
            Ok(wallet) => json!({"url": check.url, "valid": true, "wallet": wallet}),
            Err(e) => json!({"url": check.url, "valid": false, "error": e.to_string()}),
        })
        .collect();
    Ok(HttpResponse::Ok().json(results))
}

//--------------------------------------     Grants       ------------------------------------------------------------

#[post("/api/grants/incoming-payment")]
pub async fn incoming_payment_grant(
    state: web::Data<AppState>,
    params: web::Json<GrantParams>,
) -> Result<HttpResponse, ServerError> {
    let grant = state.client.request_incoming_payment_grant(&params.auth_server_url, &state.signing).await?;
    Ok(HttpResponse::Ok().json(grant_json(&grant)))
}

#[post("/api/grants/quote")]
pub async fn quote_grant(
    state: web::Data<AppState>,
    params: web::Json<GrantParams>,
) -> Result<HttpResponse, ServerError> {
    let grant = state.client.request_quote_grant(&params.auth_server_url, &state.signing).await?;
    Ok(HttpResponse::Ok().json(grant_json(&grant)))
}

#[post("/api/grants/outgoing-payment")]
pub async fn outgoing_payment_grant(
    state: web::Data<AppState>,
    params: web::Json<OutgoingGrantParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let grant = state
        .client
        .request_outgoing_payment_grant(
            &params.auth_server_url,
            &params.wallet_address_id,
            params.debit_amount,
            &state.signing,
            params.require_interaction,
        )
        .await?;
    Ok(HttpResponse::Ok().json(grant_json(&grant)))
}

#[post("/api/grants/continue")]
pub async fn continue_grant(
    state: web::Data<AppState>,
    params: web::Json<ContinueParams>,
) -> Result<HttpResponse, ServerError> {
    let finalized =
        state.client.continue_grant(&params.continue_uri, &params.continue_access_token, &state.signing).await?;
    Ok(HttpResponse::Ok().json(json!({"isFinalized": true, "grant": finalized})))
}

#[delete("/api/grants/revoke")]
pub async fn revoke_grant(
    state: web::Data<AppState>,
    params: web::Json<RevokeGrantParams>,
) -> Result<HttpResponse, ServerError> {
    state.client.revoke_grant(&params.grant_url, &params.access_token, &state.signing).await?;
    Ok(HttpResponse::Ok().json(json!({"success": true})))
}

//--------------------------------------     Incoming payments       -------------------------------------------------

#[post("/api/incoming-payments")]
pub async fn create_incoming_payment(
    state: web::Data<AppState>,
    params: web::Json<CreateIncomingPaymentParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let details = params.payment_details;
    let mut new_payment = NewIncomingPayment::new(&details.wallet_address, details.incoming_amount);
    if let Some(description) = &details.description {
        new_payment = new_payment.with_description(description);
    }
    if let Some(external_ref) = &details.external_ref {
        new_payment = new_payment.with_external_ref(external_ref);
    }
    let payment = state
        .client
        .create_incoming_payment(&params.resource_server_url, &params.access_token, &new_payment, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[post("/api/incoming-payments/get")]
pub async fn get_incoming_payment(
    state: web::Data<AppState>,
    params: web::Json<IncomingPaymentRef>,
) -> Result<HttpResponse, ServerError> {
    let payment = state
        .client
        .get_incoming_payment(&params.incoming_payment_url, &params.access_token, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[post("/api/incoming-payments/list")]
pub async fn list_incoming_payments(
    state: web::Data<AppState>,
    params: web::Json<ListPaymentsParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let page = state
        .client
        .list_incoming_payments(
            &params.resource_server_url,
            &params.wallet_address_url,
            &params.access_token,
            &state.signing,
            &params.pagination.into_pagination(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({"pagination": page.pagination, "result": page.result})))
}

#[post("/api/incoming-payments/complete")]
pub async fn complete_incoming_payment(
    state: web::Data<AppState>,
    params: web::Json<IncomingPaymentRef>,
) -> Result<HttpResponse, ServerError> {
    let payment = state
        .client
        .complete_incoming_payment(&params.incoming_payment_url, &params.access_token, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

//--------------------------------------     Quotes       ------------------------------------------------------------

#[post("/api/quotes")]
pub async fn create_quote(
    state: web::Data<AppState>,
    params: web::Json<CreateQuoteParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let details = params.quote_details;
    let mut new_quote = NewQuote::new(&details.wallet_address, &details.receiver);
    new_quote.debit_amount = details.debit_amount;
    new_quote.receive_amount = details.receive_amount;
    let quote = state
        .client
        .create_quote(&params.resource_server_url, &params.access_token, &new_quote, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(quote))
}

#[post("/api/quotes/get")]
pub async fn get_quote(
    state: web::Data<AppState>,
    params: web::Json<QuoteRef>,
) -> Result<HttpResponse, ServerError> {
    let quote = state.client.get_quote(&params.quote_url, &params.access_token, &state.signing).await?;
    Ok(HttpResponse::Ok().json(quote))
}

#[post("/api/quotes/fixed-send")]
pub async fn quote_fixed_send(
    state: web::Data<AppState>,
    params: web::Json<FixedQuoteParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let debit_amount = params
        .debit_amount
        .ok_or_else(|| ServerError::InvalidRequest("debitAmount is required".into()))?;
    let new_quote = NewQuote::fixed_send(&params.wallet_address, &params.receiver, debit_amount);
    let quote = state
        .client
        .create_quote(&params.resource_server_url, &params.access_token, &new_quote, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(quote))
}

#[post("/api/quotes/fixed-receive")]
pub async fn quote_fixed_receive(
    state: web::Data<AppState>,
    params: web::Json<FixedQuoteParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let receive_amount = params
        .receive_amount
        .ok_or_else(|| ServerError::InvalidRequest("receiveAmount is required".into()))?;
    let new_quote = NewQuote::fixed_receive(&params.wallet_address, &params.receiver, receive_amount);
    let quote = state
        .client
        .create_quote(&params.resource_server_url, &params.access_token, &new_quote, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(quote))
}

//--------------------------------------     Outgoing payments       -------------------------------------------------

#[post("/api/outgoing-payments")]
pub async fn create_outgoing_payment(
    state: web::Data<AppState>,
    params: web::Json<CreateOutgoingPaymentParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let details = params.payment_details;
    let mut new_payment = NewOutgoingPayment::new(&details.wallet_address, &details.quote_id);
    if let Some(metadata) = details.metadata {
        new_payment = new_payment.with_metadata(metadata);
    }
    let payment = state
        .client
        .create_outgoing_payment(&params.resource_server_url, &params.access_token, &new_payment, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[post("/api/outgoing-payments/get")]
pub async fn get_outgoing_payment(
    state: web::Data<AppState>,
    params: web::Json<OutgoingPaymentRef>,
) -> Result<HttpResponse, ServerError> {
    let payment = state
        .client
        .get_outgoing_payment(&params.outgoing_payment_url, &params.access_token, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[post("/api/outgoing-payments/list")]
pub async fn list_outgoing_payments(
    state: web::Data<AppState>,
    params: web::Json<ListPaymentsParams>,
) -> Result<HttpResponse, ServerError> {
    let params = params.into_inner();
    let page = state
        .client
        .list_outgoing_payments(
            &params.resource_server_url,
            &params.wallet_address_url,
            &params.access_token,
            &state.signing,
            &params.pagination.into_pagination(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({"pagination": page.pagination, "result": page.result})))
}

//--------------------------------------     Tokens       ------------------------------------------------------------

#[post("/api/tokens/rotate")]
pub async fn rotate_token(
    state: web::Data<AppState>,
    params: web::Json<TokenParams>,
) -> Result<HttpResponse, ServerError> {
    let token = state
        .client
        .rotate_access_token(&params.token_management_url, &params.access_token, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(token))
}

#[delete("/api/tokens/revoke")]
pub async fn revoke_token(
    state: web::Data<AppState>,
    params: web::Json<TokenParams>,
) -> Result<HttpResponse, ServerError> {
    state
        .client
        .revoke_access_token(&params.token_management_url, &params.access_token, &state.signing)
        .await?;
    Ok(HttpResponse::Ok().json(json!({"success": true})))
}

//--------------------------------------     Payment links & referral webhook       ----------------------------------

#[post("/api/payment-link")]
pub async fn payment_link(params: web::Json<PaymentLinkParams>) -> Result<HttpResponse, ServerError> {
    let links = PaymentLinks::new(&params.receiver, params.amount.as_deref());
    Ok(HttpResponse::Ok().json(links))
}

/// Conversion ping fired when a referred visitor lands on a product page.
#[get("/api/referral/webhook")]
pub async fn referral_webhook(
    state: web::Data<AppState>,
    query: web::Query<ReferralWebhookQuery>,
) -> Result<HttpResponse, ServerError> {
    let count = state.sales.record(&query.product_id, &query.referrer_id)?;
    debug!("Referral visit #{count} for product {} via {}", query.product_id, query.referrer_id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "productId": query.product_id,
        "referrerId": query.referrer_id,
        "count": count,
    })))
}
