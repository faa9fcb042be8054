//! Referral-split payment links.
//!
//! A referred sale pays out two incoming payments instead of one: 95% of the product price to the seller and 5%
//! to the referrer, both denominated in the wallets' shared asset. The endpoint provisions both sides (grant,
//! incoming payment, link), records the transaction, and hands back the two hosted payment links.

use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use log::*;
use op_common::{minor_units_from_decimal, split_minor_amount, Amount, MinorUnits};
use open_payments::{
    FinalizedGrant, Grant, IncomingPayment, NewIncomingPayment, OpenPaymentsClient, PaymentLinks, SigningConfig,
    WalletAddress,
};
use rand::Rng;
use serde_json::json;

use crate::{
    data_objects::{ReferralLinkQuery, ReferralLinkResponse},
    errors::ServerError,
    server::AppState,
    store::{Product, ReferralTransaction},
};

const SELLER_PERCENT: u8 = 95;

#[get("/api/referral/link")]
pub async fn referral_link(
    state: web::Data<AppState>,
    query: web::Query<ReferralLinkQuery>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    let product = state
        .catalog
        .get(query.product_id)?
        .ok_or_else(|| ServerError::NotFound(format!("Product with id {} not found", query.product_id)))?;
    if product.price <= 0.0 {
        return Err(ServerError::InvalidRequest("Product price must be a positive number".into()));
    }

    let transaction =
        build_referral_split(&state.client, &state.signing, &product, &query.referrer_id).await?;
    let response = ReferralLinkResponse {
        seller_payment_link: transaction.seller_links.web_link.clone(),
        referral_payment_link: transaction.referral_links.web_link.clone(),
    };
    state.transactions.append(transaction.into_record(&product, &query.referrer_id))?;
    info!("Issued referral split links for product #{} via {}", product.id, query.referrer_id);
    Ok(HttpResponse::Ok().json(response))
}

/// Everything provisioned for one referral split, before it is flattened into the stored record.
#[derive(Debug)]
pub struct ReferralSplit {
    pub total: MinorUnits,
    pub seller_amount: Amount,
    pub referral_amount: Amount,
    pub seller_payment: IncomingPayment,
    pub referral_payment: IncomingPayment,
    pub seller_links: PaymentLinks,
    pub referral_links: PaymentLinks,
}

impl ReferralSplit {
    fn into_record(self, product: &Product, referrer_id: &str) -> ReferralTransaction {
        let suffix: u64 = rand::thread_rng().gen();
        ReferralTransaction {
            transaction_id: format!("ref_{}_{}_{suffix:x}", product.id, Utc::now().timestamp_millis()),
            product_id: product.id.to_string(),
            product: json!({"id": product.id, "title": product.title, "price": product.price}),
            seller: json!({
                "walletAddress": self.seller_payment.wallet_address,
                "amount": self.seller_amount,
            }),
            referral: json!({
                "walletAddress": self.referral_payment.wallet_address,
                "amount": self.referral_amount,
            }),
            referrer_id: referrer_id.to_string(),
            split: json!({
                "total": self.total.value(),
                "sellerPercentage": SELLER_PERCENT,
                "referralPercentage": 100 - SELLER_PERCENT,
            }),
            created_at: Utc::now(),
            payment_links: json!({"seller": self.seller_links, "referral": self.referral_links}),
            incoming_payments: json!({
                "seller": self.seller_payment.id,
                "referral": self.referral_payment.id,
            }),
        }
    }
}

/// Provision both sides of the split. The two wallet lookups, the two grants and the two incoming payments each
/// run concurrently; the first failure of a pair surfaces with its branch named.
pub async fn build_referral_split(
    client: &OpenPaymentsClient,
    signing: &SigningConfig,
    product: &Product,
    referrer_id: &str,
) -> Result<ReferralSplit, ServerError> {
    let (seller_wallet, referrer_wallet) = futures::try_join!(
        fetch_wallet(client, &product.seller_wallet_address, "seller"),
        fetch_wallet(client, referrer_id, "referral"),
    )?;

    if seller_wallet.asset_code != referrer_wallet.asset_code
        || seller_wallet.asset_scale != referrer_wallet.asset_scale
    {
        return Err(ServerError::InvalidRequest(
            "Seller and referral wallets must share the same assetCode and assetScale".into(),
        ));
    }

    let scale = seller_wallet.asset_scale;
    let total = minor_units_from_decimal(product.price, scale)
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    let (seller_share, referral_share) = split_minor_amount(total, SELLER_PERCENT);
    if !seller_share.is_positive() || !referral_share.is_positive() {
        return Err(ServerError::InvalidRequest("Calculated split amounts must be greater than zero".into()));
    }
    let seller_amount = Amount::new(seller_share, &seller_wallet.asset_code, scale);
    let referral_amount = Amount::new(referral_share, &referrer_wallet.asset_code, scale);

    let (seller_grant, referrer_grant) = futures::try_join!(
        fetch_incoming_grant(client, signing, &seller_wallet.auth_server, "seller"),
        fetch_incoming_grant(client, signing, &referrer_wallet.auth_server, "referral"),
    )?;

    let (seller_payment, referral_payment) = futures::try_join!(
        create_share_payment(
            client,
            signing,
            &seller_wallet,
            &seller_grant,
            seller_amount.clone(),
            format!("Sale of {} (seller share)", product.title),
            "seller",
        ),
        create_share_payment(
            client,
            signing,
            &referrer_wallet,
            &referrer_grant,
            referral_amount.clone(),
            format!("Referral reward for product {}", product.title),
            "referral",
        ),
    )?;

    let seller_links = PaymentLinks::new(&seller_payment.id, Some(&seller_amount.value));
    let referral_links = PaymentLinks::new(&referral_payment.id, Some(&referral_amount.value));

    Ok(ReferralSplit {
        total,
        seller_amount,
        referral_amount,
        seller_payment,
        referral_payment,
        seller_links,
        referral_links,
    })
}

async fn fetch_wallet(
    client: &OpenPaymentsClient,
    url: &str,
    branch: &str,
) -> Result<WalletAddress, ServerError> {
    client
        .get_wallet_address(url)
        .await
        .map_err(|e| ServerError::UpstreamError(format!("Unable to fetch {branch} wallet info: {e}")))
}

/// Incoming payment grants are expected to finalize without interaction; a pending one is a 409.
async fn fetch_incoming_grant(
    client: &OpenPaymentsClient,
    signing: &SigningConfig,
    auth_server: &str,
    branch: &str,
) -> Result<FinalizedGrant, ServerError> {
    let grant = client.request_incoming_payment_grant(auth_server, signing).await.map_err(|e| {
        ServerError::UpstreamError(format!("Failed to obtain {branch} incoming payment grant: {e}"))
    })?;
    match grant {
        Grant::Finalized(finalized) => Ok(finalized),
        Grant::Pending(pending) => Err(ServerError::GrantPending {
            grant: serde_json::to_value(&pending).unwrap_or_else(|_| json!({})),
        }),
    }
}

async fn create_share_payment(
    client: &OpenPaymentsClient,
    signing: &SigningConfig,
    wallet: &WalletAddress,
    grant: &FinalizedGrant,
    amount: Amount,
    description: String,
    branch: &str,
) -> Result<IncomingPayment, ServerError> {
    let details = NewIncomingPayment::new(&wallet.id, amount).with_description(&description);
    client
        .create_incoming_payment(&wallet.resource_server, &grant.access_token.value, &details, signing)
        .await
        .map_err(|e| ServerError::UpstreamError(format!("Failed to create {branch} incoming payment: {e}")))
}
