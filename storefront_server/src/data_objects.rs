//! Request and response payloads for the JSON API.

use op_common::Amount;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::NewProduct;

#[derive(Debug, Deserialize)]
pub struct ProductSearch {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct AddProduct {
    pub product: NewProduct,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletLookup {
    pub wallet_address_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBatch {
    pub wallet_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantParams {
    pub auth_server_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingGrantParams {
    pub auth_server_url: String,
    pub wallet_address_id: String,
    pub debit_amount: Amount,
    #[serde(default = "default_true")]
    pub require_interaction: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueParams {
    pub continue_uri: String,
    pub continue_access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeGrantParams {
    pub grant_url: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncomingPaymentParams {
    pub resource_server_url: String,
    pub access_token: String,
    pub payment_details: IncomingPaymentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPaymentDetails {
    pub wallet_address: String,
    pub incoming_amount: Amount,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPaymentRef {
    pub incoming_payment_url: String,
    pub access_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub first: Option<u32>,
    #[serde(default)]
    pub last: Option<u32>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl PaginationParams {
    pub fn into_pagination(self) -> open_payments::Pagination {
        open_payments::Pagination { first: self.first, last: self.last, cursor: self.cursor }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsParams {
    pub resource_server_url: String,
    pub wallet_address_url: String,
    pub access_token: String,
    #[serde(default)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteParams {
    pub resource_server_url: String,
    pub access_token: String,
    pub quote_details: QuoteDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetails {
    pub wallet_address: String,
    pub receiver: String,
    #[serde(default)]
    pub debit_amount: Option<Amount>,
    #[serde(default)]
    pub receive_amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRef {
    pub quote_url: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedQuoteParams {
    pub resource_server_url: String,
    pub access_token: String,
    pub wallet_address: String,
    pub receiver: String,
    #[serde(default)]
    pub debit_amount: Option<Amount>,
    #[serde(default)]
    pub receive_amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutgoingPaymentParams {
    pub resource_server_url: String,
    pub access_token: String,
    pub payment_details: OutgoingPaymentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPaymentDetails {
    pub wallet_address: String,
    pub quote_id: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPaymentRef {
    pub outgoing_payment_url: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenParams {
    pub token_management_url: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkParams {
    pub receiver: String,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralWebhookQuery {
    pub product_id: String,
    pub referrer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralLinkQuery {
    pub product_id: u64,
    pub referrer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutParams {
    /// The buyer's wallet address URL.
    pub sender_wallet_address: String,
    /// The seller's wallet address URL.
    pub receiver_wallet_address: String,
    /// Amount in the receiver's minor units, as an integer string.
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralLinkResponse {
    pub seller_payment_link: String,
    pub referral_payment_link: String,
}

fn default_true() -> bool {
    true
}
