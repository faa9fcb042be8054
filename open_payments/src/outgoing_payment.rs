use chrono::{DateTime, Utc};
use op_common::Amount;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    client::{join_url, HttpRequestSpec, OpenPaymentsClient},
    config::SigningConfig,
    error::OpenPaymentsError,
    pagination::{PaginatedResult, Pagination},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPayment {
    pub id: String,
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debit_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Details for a new outgoing payment, funded by a previously created quote.
#[derive(Debug, Clone)]
pub struct NewOutgoingPayment {
    pub wallet_address: String,
    pub quote_id: String,
    pub metadata: Option<Value>,
}

impl NewOutgoingPayment {
    pub fn new(wallet_address: &str, quote_id: &str) -> Self {
        Self { wallet_address: wallet_address.to_string(), quote_id: quote_id.to_string(), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn to_body(&self) -> Value {
        let mut body = json!({
            "walletAddress": self.wallet_address,
            "quoteId": self.quote_id,
        });
        if let Some(metadata) = &self.metadata {
            body["metadata"] = metadata.clone();
        }
        body
    }
}

impl OpenPaymentsClient {
    /// POST `{resource_server}/outgoing-payments`. Requires a token from a finalized outgoing-payment grant.
    pub async fn create_outgoing_payment(
        &self,
        resource_server_url: &str,
        access_token: &str,
        details: &NewOutgoingPayment,
        config: &SigningConfig,
    ) -> Result<OutgoingPayment, OpenPaymentsError> {
        let url = join_url(resource_server_url, "outgoing-payments")?;
        let spec = HttpRequestSpec::post(url.as_str(), details.to_body()).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }

    /// GET an outgoing payment by its URL.
    pub async fn get_outgoing_payment(
        &self,
        outgoing_payment_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<OutgoingPayment, OpenPaymentsError> {
        let spec = HttpRequestSpec::get(outgoing_payment_url).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }

    /// GET `{resource_server}/outgoing-payments?wallet-address=..` with optional pagination.
    pub async fn list_outgoing_payments(
        &self,
        resource_server_url: &str,
        wallet_address_url: &str,
        access_token: &str,
        config: &SigningConfig,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<OutgoingPayment>, OpenPaymentsError> {
        let mut url = join_url(resource_server_url, "outgoing-payments")?;
        url.query_pairs_mut().append_pair("wallet-address", wallet_address_url);
        pagination.append_to(&mut url);
        let spec = HttpRequestSpec::get(url.as_str()).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metadata_only_when_provided() {
        let bare = NewOutgoingPayment::new("https://ilp.example/buyer", "https://rs.example/quotes/1").to_body();
        assert!(bare.get("metadata").is_none());
        assert_eq!(bare["quoteId"], "https://rs.example/quotes/1");

        let tagged = NewOutgoingPayment::new("https://ilp.example/buyer", "https://rs.example/quotes/1")
            .with_metadata(json!({"description": "Order 42"}))
            .to_body();
        assert_eq!(tagged["metadata"]["description"], "Order 42");
    }
}
