use chrono::{DateTime, Utc};
use op_common::Amount;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    client::{join_url, HttpRequestSpec, OpenPaymentsClient},
    config::SigningConfig,
    error::OpenPaymentsError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub wallet_address: String,
    pub receiver: String,
    pub debit_amount: Amount,
    pub receive_amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Details for a new quote. A quote fixes either the debit side or the receive side, never both; when both are
/// supplied the debit amount wins, matching the upstream API's precedence.
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub wallet_address: String,
    pub receiver: String,
    pub method: String,
    pub debit_amount: Option<Amount>,
    pub receive_amount: Option<Amount>,
}

impl NewQuote {
    pub fn new(wallet_address: &str, receiver: &str) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            receiver: receiver.to_string(),
            method: "ilp".to_string(),
            debit_amount: None,
            receive_amount: None,
        }
    }

    /// Quote where the sender fixes how much leaves their account.
    pub fn fixed_send(wallet_address: &str, receiver: &str, debit_amount: Amount) -> Self {
        let mut quote = Self::new(wallet_address, receiver);
        quote.debit_amount = Some(debit_amount);
        quote
    }

    /// Quote where the sender fixes how much the receiver gets.
    pub fn fixed_receive(wallet_address: &str, receiver: &str, receive_amount: Amount) -> Self {
        let mut quote = Self::new(wallet_address, receiver);
        quote.receive_amount = Some(receive_amount);
        quote
    }

    fn to_body(&self) -> Value {
        let mut body = json!({
            "walletAddress": self.wallet_address,
            "receiver": self.receiver,
            "method": self.method,
        });
        if let Some(debit_amount) = &self.debit_amount {
            body["debitAmount"] = json!(debit_amount);
        } else if let Some(receive_amount) = &self.receive_amount {
            body["receiveAmount"] = json!(receive_amount);
        }
        body
    }
}

impl OpenPaymentsClient {
    /// POST `{resource_server}/quotes`.
    pub async fn create_quote(
        &self,
        resource_server_url: &str,
        access_token: &str,
        details: &NewQuote,
        config: &SigningConfig,
    ) -> Result<Quote, OpenPaymentsError> {
        let url = join_url(resource_server_url, "quotes")?;
        let spec = HttpRequestSpec::post(url.as_str(), details.to_body()).with_access_token(access_token);
        self.send(spec, Some(config), None).await?.deserialize()
    }

    /// GET a quote by its URL.
    pub async fn get_quote(
        &self,
        quote_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<Quote, OpenPaymentsError> {
        let spec = HttpRequestSpec::get(quote_url).with_access_token(access_token);
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
    fn amount_sides_are_mutually_exclusive() {
        let send = NewQuote::fixed_send("https://ilp.example/buyer", "https://rs.example/ip/1", amount(1000));
        let body = send.to_body();
        assert_eq!(body["debitAmount"]["value"], "1000");
        assert!(body.get("receiveAmount").is_none());
        assert_eq!(body["method"], "ilp");

        let receive = NewQuote::fixed_receive("https://ilp.example/buyer", "https://rs.example/ip/1", amount(950));
        let body = receive.to_body();
        assert_eq!(body["receiveAmount"]["value"], "950");
        assert!(body.get("debitAmount").is_none());

        // Debit wins when both are set.
        let mut both = NewQuote::fixed_send("https://ilp.example/buyer", "https://rs.example/ip/1", amount(1000));
        both.receive_amount = Some(amount(950));
        let body = both.to_body();
        assert!(body.get("debitAmount").is_some());
        assert!(body.get("receiveAmount").is_none());
    }

}
