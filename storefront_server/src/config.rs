use std::{env, path::PathBuf};

use log::*;
use open_payments::SigningConfig;

use crate::errors::ServerError;

const DEFAULT_OPS_HOST: &str = "127.0.0.1";
const DEFAULT_OPS_PORT: u16 = 3000;
const DEFAULT_PRODUCTS_FILE: &str = "data/products.json";
const DEFAULT_REFERRAL_SALES_FILE: &str = "data/referral_sales.json";
const DEFAULT_REFERRAL_TX_FILE: &str = "data/referral_transactions.json";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The server's own wallet identity, signing key path and key id.
    pub signing: SigningConfig,
    pub store: StoreConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub products_file: PathBuf,
    pub referral_sales_file: PathBuf,
    pub referral_tx_file: PathBuf,
}

impl ServerConfig {
    /// Resolve the configuration from the environment, once, at startup.
    ///
    /// `OPS_WALLET_ADDRESS`, `OPS_PRIVATE_KEY` and `OPS_KEY_ID` are required; there is no fallback wallet to
    /// accidentally sign with. Host, port and store paths have sensible defaults.
    pub fn try_from_env() -> Result<Self, ServerError> {
        let host = env::var("OPS_HOST").ok().unwrap_or_else(|| DEFAULT_OPS_HOST.into());
        let port = env::var("OPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("{s} is not a valid port for OPS_PORT. {e} Using the default, {DEFAULT_OPS_PORT}, instead.");
                    DEFAULT_OPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_OPS_PORT);

        let wallet_address = require_env("OPS_WALLET_ADDRESS")?;
        let private_key = require_env("OPS_PRIVATE_KEY")?;
        let key_id = require_env("OPS_KEY_ID")?;
        let signing = SigningConfig::new(&wallet_address, private_key, &key_id);

        let store = StoreConfig {
            products_file: path_from_env("OPS_PRODUCTS_FILE", DEFAULT_PRODUCTS_FILE),
            referral_sales_file: path_from_env("OPS_REFERRAL_SALES_FILE", DEFAULT_REFERRAL_SALES_FILE),
            referral_tx_file: path_from_env("OPS_REFERRAL_TX_FILE", DEFAULT_REFERRAL_TX_FILE),
        };

        Ok(Self { host, port, signing, store })
    }
}

fn require_env(var: &str) -> Result<String, ServerError> {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServerError::ConfigurationError(format!("{var} must be set")))
}

fn path_from_env(var: &str, default: &str) -> PathBuf {
    env::var(var).map(PathBuf::from).ok().unwrap_or_else(|| PathBuf::from(default))
}
