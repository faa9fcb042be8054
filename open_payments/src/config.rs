use std::path::PathBuf;

/// Identifies the client's own wallet and the key it signs requests with.
///
/// Immutable once constructed. The owning process resolves this once at startup (from environment or
/// command-line) and passes it by reference into every operation; nothing in this crate reads the environment.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// The client's own wallet address URL, sent as the `client` field of grant requests.
    pub wallet_address_url: String,
    /// Path to the Ed25519 private key, PKCS#8 PEM encoded.
    pub private_key_path: PathBuf,
    /// The key identifier registered against the wallet address. Every emitted `Signature-Input` header carries
    /// exactly this value.
    pub key_id: String,
}

impl SigningConfig {
    pub fn new(wallet_address_url: &str, private_key_path: impl Into<PathBuf>, key_id: &str) -> Self {
        Self {
            wallet_address_url: wallet_address_url.to_string(),
            private_key_path: private_key_path.into(),
            key_id: key_id.to_string(),
        }
    }
}
