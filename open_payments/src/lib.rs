//! Client for the Open Payments APIs: signed HTTP requests (RFC 9421, Ed25519), the GNAP grant lifecycle, and
//! typed wrappers for wallet addresses, incoming payments, quotes, outgoing payments and access tokens.

mod client;
mod config;
mod error;
mod grants;
mod incoming_payment;
mod key_store;
mod outgoing_payment;
mod pagination;
mod payment_link;
mod polling;
mod quotes;
mod signature;
mod tokens;
mod wallet_address;

pub use client::{HttpRequestSpec, OpenPaymentsClient, ParsedBody, RequestOptions};
pub use config::SigningConfig;
pub use error::OpenPaymentsError;
pub use grants::{
    AccessAction, AccessLimits, AccessScope, AccessToken, AccessTokenRequest, AccessType, ContinueDescriptor,
    ContinueToken, FinalizedGrant, Grant, GrantRequest, InteractRequest, InteractResponse, PendingGrant,
};
pub use incoming_payment::{IncomingPayment, NewIncomingPayment};
pub use key_store::KeyStore;
pub use outgoing_payment::{NewOutgoingPayment, OutgoingPayment};
pub use pagination::{PageCursors, PaginatedResult, Pagination};
pub use payment_link::{PaymentLinks, WEB_PAYMENT_BASE_URL};
pub use polling::wait_for_completion;
pub use quotes::{NewQuote, Quote};
pub use signature::SignatureHeaders;
pub use wallet_address::{WalletAddress, WalletCheck};
