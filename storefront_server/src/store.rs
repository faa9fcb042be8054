//! Flat-file JSON stores.
//!
//! The catalog and referral records are small JSON arrays on disk, read and rewritten whole under a mutex. This
//! is the only persistence the storefront has; anything that outgrows it belongs in a real database.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub seller_wallet_address: String,
    pub title: String,
    pub description: String,
    /// Price in major units of the seller wallet's asset, e.g. 10.50.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A product as submitted by a seller; id and image are filled in by the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub seller_wallet_address: Option<String>,
}

#[derive(Debug)]
pub struct ProductCatalog {
    path: PathBuf,
    /// Serialises read-modify-write cycles on the backing file.
    lock: Mutex<()>,
    default_seller_wallet: String,
}

impl ProductCatalog {
    pub fn new(path: impl Into<PathBuf>, default_seller_wallet: &str) -> Self {
        Self { path: path.into(), lock: Mutex::new(()), default_seller_wallet: default_seller_wallet.to_string() }
    }

    /// Products whose title or description contains `query`. An empty query matches everything.
    pub fn search(&self, query: &str) -> Result<Vec<Product>, ServerError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let products: Vec<Product> = read_json_array(&self.path)?;
        Ok(products.into_iter().filter(|p| p.title.contains(query) || p.description.contains(query)).collect())
    }

    pub fn get(&self, id: u64) -> Result<Option<Product>, ServerError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let products: Vec<Product> = read_json_array(&self.path)?;
        Ok(products.into_iter().find(|p| p.id == id))
    }

    /// Add a product: next sequential id, placeholder image, and the server's wallet as seller when the
    /// submission does not name one.
    pub fn add(&self, new: NewProduct) -> Result<Product, ServerError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut products: Vec<Product> = read_json_array(&self.path)?;
        let id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let image_id = rand::thread_rng().gen_range(1..=1084);
        let product = Product {
            id,
            seller_wallet_address: new
                .seller_wallet_address
                .unwrap_or_else(|| self.default_seller_wallet.clone()),
            title: new.title,
            description: new.description,
            price: new.price,
            image: Some(format!("https://picsum.photos/id/{image_id}/400/300")),
        };
        products.push(product.clone());
        write_json_array(&self.path, &products)?;
        Ok(product)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSale {
    pub product_id: String,
    pub referrer_id: String,
    pub count: u64,
}

/// Tally of conversions per (product, referrer) pair, fed by the referral webhook.
#[derive(Debug)]
pub struct ReferralSales {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReferralSales {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Bump the counter for the pair, creating it at 1 on first sight. Returns the new count.
    pub fn record(&self, product_id: &str, referrer_id: &str) -> Result<u64, ServerError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut sales: Vec<ReferralSale> = read_json_array(&self.path)?;
        let count = match sales.iter_mut().find(|s| s.product_id == product_id && s.referrer_id == referrer_id) {
            Some(sale) => {
                sale.count += 1;
                sale.count
            },
            None => {
                sales.push(ReferralSale {
                    product_id: product_id.to_string(),
                    referrer_id: referrer_id.to_string(),
                    count: 1,
                });
                1
            },
        };
        write_json_array(&self.path, &sales)?;
        Ok(count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTransaction {
    pub transaction_id: String,
    pub product_id: String,
    pub product: Value,
    pub seller: Value,
    pub referral: Value,
    pub referrer_id: String,
    pub split: Value,
    pub created_at: DateTime<Utc>,
    pub payment_links: Value,
    pub incoming_payments: Value,
}

/// Append-only log of referral-split transactions.
#[derive(Debug)]
pub struct ReferralTransactions {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReferralTransactions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn append(&self, transaction: ReferralTransaction) -> Result<(), ServerError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut transactions: Vec<ReferralTransaction> = read_json_array(&self.path)?;
        transactions.push(transaction);
        write_json_array(&self.path, &transactions)
    }

    pub fn all(&self) -> Result<Vec<ReferralTransaction>, ServerError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        read_json_array(&self.path)
    }
}

/// A missing or empty file reads as an empty array; malformed JSON is a store error, not silently discarded.
fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ServerError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ServerError::StoreError(format!("Could not read {}. {e}", path.display()))),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text)
        .map_err(|e| ServerError::StoreError(format!("Malformed JSON in {}. {e}", path.display())))
}

fn write_json_array<T: Serialize>(path: &Path, items: &[T]) -> Result<(), ServerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| ServerError::StoreError(format!("Could not create {}. {e}", parent.display())))?;
        }
    }
    let text = serde_json::to_string_pretty(items)
        .map_err(|e| ServerError::StoreError(format!("Could not serialize store contents. {e}")))?;
    fs::write(path, text)
        .map_err(|e| ServerError::StoreError(format!("Could not write {}. {e}", path.display())))
}
