use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{join_url, OpenPaymentsClient, RequestOptions},
    error::OpenPaymentsError,
};

/// Public information about a wallet address: where its authorization and resource servers live, and what
/// asset it is denominated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_name: Option<String>,
    pub asset_code: String,
    pub asset_scale: u8,
    pub auth_server: String,
    pub resource_server: String,
}

/// The outcome of validating a single wallet address within a batch.
#[derive(Debug)]
pub struct WalletCheck {
    pub url: String,
    pub result: Result<WalletAddress, OpenPaymentsError>,
}

impl WalletCheck {
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

impl OpenPaymentsClient {
    /// Fetch the public wallet address document. Unsigned GET; wallet addresses are public.
    pub async fn get_wallet_address(&self, wallet_address_url: &str) -> Result<WalletAddress, OpenPaymentsError> {
        self.get(wallet_address_url, RequestOptions::default()).await?.deserialize()
    }

    /// Fetch the JWKS published for a wallet address.
    pub async fn get_wallet_address_keys(&self, wallet_address_url: &str) -> Result<Value, OpenPaymentsError> {
        let url = join_url(wallet_address_url, "jwks.json")?;
        self.get(url.as_str(), RequestOptions::default()).await?.into_json()
    }

    /// Validate a batch of wallet addresses concurrently.
    ///
    /// Each address succeeds or fails on its own; one bad address never fails the batch. The returned list is
    /// in input order, one entry per address.
    pub async fn validate_wallet_addresses(&self, wallet_address_urls: &[String]) -> Vec<WalletCheck> {
        let checks = wallet_address_urls.iter().map(|url| async move {
            WalletCheck { url: url.clone(), result: self.get_wallet_address(url).await }
        });
        join_all(checks).await
    }
}
