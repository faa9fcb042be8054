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
pub struct IncomingPayment {
    pub id: String,
    pub wallet_address: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoming_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl IncomingPayment {
    /// A payment is complete when the server says so, or when the received amount has reached the expected
    /// amount. Unparseable or missing amounts count as incomplete.
    pub fn is_complete(&self) -> bool {
        if self.completed {
            return true;
        }
        match (&self.incoming_amount, &self.received_amount) {
            (Some(expected), Some(received)) => match (expected.minor_units(), received.minor_units()) {
                (Ok(expected), Ok(received)) => received >= expected,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Details for a new incoming payment. Optional fields are only put on the wire when supplied.
#[derive(Debug, Clone)]
pub struct NewIncomingPayment {
    pub wallet_address: String,
    pub incoming_amount: Amount,
    pub description: Option<String>,
    pub external_ref: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewIncomingPayment {
    pub fn new(wallet_address: &str, incoming_amount: Amount) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            incoming_amount,
            description: None,
            external_ref: None,
            expires_at: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_external_ref(mut self, external_ref: &str) -> Self {
        self.external_ref = Some(external_ref.to_string());
        self
    }

    fn to_body(&self) -> Value {
        let mut body = json!({
            "walletAddress": self.wallet_address,
            "incomingAmount": self.incoming_amount,
        });
        if let Some(description) = &self.description {
            body["metadata"] = json!({ "description": description });
        }
        if let Some(external_ref) = &self.external_ref {
            body["externalRef"] = json!(external_ref);
        }
        if let Some(expires_at) = &self.expires_at {
            body["expiresAt"] = json!(expires_at);
        }
        body
    }
}

impl OpenPaymentsClient {
    /// POST `{resource_server}/incoming-payments`.
    pub async fn create_incoming_payment(
        &self,
        resource_server_url: &str,
        access_token: &str,
        details: &NewIncomingPayment,
        config: &SigningConfig,
    ) -> Result<IncomingPayment, OpenPaymentsError> {
        let url = join_url(resource_server_url, "incoming-payments")?;
        let spec = HttpRequestSpec::post(url.as_str(), details.to_body()).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }

    /// GET an incoming payment by its URL. Signed, because the token is present.
    pub async fn get_incoming_payment(
        &self,
        incoming_payment_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<IncomingPayment, OpenPaymentsError> {
        let spec = HttpRequestSpec::get(incoming_payment_url).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }

    /// GET `{resource_server}/incoming-payments?wallet-address=..`, with pagination parameters attached only
    /// when present.
    pub async fn list_incoming_payments(
        &self,
        resource_server_url: &str,
        wallet_address_url: &str,
        access_token: &str,
        config: &SigningConfig,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<IncomingPayment>, OpenPaymentsError> {
        let mut url = join_url(resource_server_url, "incoming-payments")?;
        url.query_pairs_mut().append_pair("wallet-address", wallet_address_url);
        pagination.append_to(&mut url);
        let spec = HttpRequestSpec::get(url.as_str()).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }

    /// POST `{incoming_payment_url}/complete`, marking the payment as done before its full amount arrived.
    pub async fn complete_incoming_payment(
        &self,
        incoming_payment_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<IncomingPayment, OpenPaymentsError> {
        let url = join_url(incoming_payment_url, "complete")?;
        let spec =
            HttpRequestSpec::new(reqwest::Method::POST, url.as_str()).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }
}

#[cfg(test)]
mod test {
    use op_common::MinorUnits;

    use super::*;

    fn amount(value: i64) -> Amount {
        Amount::new(MinorUnits::from(value), "USD", 2)
    }

    #[test]
    fn optional_fields_only_when_provided() {
        let bare = NewIncomingPayment::new("https://ilp.example/alice", amount(950)).to_body();
        assert!(bare.get("metadata").is_none());
        assert!(bare.get("externalRef").is_none());
        assert!(bare.get("expiresAt").is_none());
        assert_eq!(bare["incomingAmount"]["value"], "950");

        let full = NewIncomingPayment::new("https://ilp.example/alice", amount(950))
            .with_description("Sale of widget")
            .with_external_ref("INV-7")
            .to_body();
        assert_eq!(full["metadata"]["description"], "Sale of widget");
        assert_eq!(full["externalRef"], "INV-7");
    }

    #[test]
    fn completion_check() {
        let mut payment = IncomingPayment {
            id: "https://rs.example/incoming-payments/1".into(),
            wallet_address: "https://ilp.example/alice".into(),
            completed: false,
            incoming_amount: Some(amount(1000)),
            received_amount: Some(amount(999)),
            metadata: None,
            expires_at: None,
            created_at: None,
        };
        assert!(!payment.is_complete());
        payment.received_amount = Some(amount(1000));
        assert!(payment.is_complete());
        payment.received_amount = None;
        assert!(!payment.is_complete());
        payment.completed = true;
        assert!(payment.is_complete());
    }
}
