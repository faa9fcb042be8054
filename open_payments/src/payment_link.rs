use serde::{Deserialize, Serialize};

/// Base URL of the hosted payment-choice page used for web links.
pub const WEB_PAYMENT_BASE_URL: &str = "https://pay.interledger-test.dev/payment-choice";

/// A pair of shareable links pointing a payer at an incoming payment: a wallet-app deep link and a hosted web
/// fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinks {
    pub deep_link: String,
    pub web_link: String,
    pub receiver: String,
}

impl PaymentLinks {
    /// Build links for the given receiver (an incoming payment URL). The amount is optional; when omitted the
    /// payer's wallet decides how much to send.
    pub fn new(receiver: &str, amount: Option<&str>) -> Self {
        let encoded_receiver = urlencoding::encode(receiver);
        let amount_param = match amount {
            Some(amount) => format!("&amount={}", urlencoding::encode(amount)),
            None => String::new(),
        };
        Self {
            deep_link: format!("openpayments://pay?receiver={encoded_receiver}{amount_param}"),
            web_link: format!("{WEB_PAYMENT_BASE_URL}?receiver={encoded_receiver}{amount_param}"),
            receiver: receiver.to_string(),
        }
    }
}
