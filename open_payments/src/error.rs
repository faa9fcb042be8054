use std::path::PathBuf;

use thiserror::Error;

use crate::client::ParsedBody;

/// The closed set of failures the Open Payments client can produce.
///
/// Callers branch on the variant, never on message text. `RequestFailed` carries the HTTP status so the route
/// layer can distinguish remote validation failures (4xx) from remote faults (5xx); `Transport` covers failures
/// where no HTTP status exists (DNS, TLS, timeouts).
#[derive(Debug, Error)]
pub enum OpenPaymentsError {
    #[error("Private key file not found at {0}")]
    KeyNotFound(PathBuf),
    #[error("Could not read private key at {path}. {reason}")]
    KeyUnreadable { path: PathBuf, reason: String },
    #[error("Signing was required for this request, but no signing configuration was provided")]
    SigningConfigMissing,
    #[error("Could not compute the request signature. {0}")]
    SigningError(String),
    #[error("Request failed with status {status}. {body}")]
    RequestFailed { status: u16, body: ParsedBody },
    #[error("Grant continuation did not produce a finalized grant")]
    GrantNotFinalized,
    #[error("Transport error. {0}")]
    Transport(String),
    #[error("Unexpected response from server. {0}")]
    UnexpectedResponse(String),
    #[error("Invalid URL. {0}")]
    InvalidUrl(String),
    #[error("Operation did not complete after {attempts} polling attempts")]
    PollTimeout { attempts: u32 },
}

impl OpenPaymentsError {
    /// The HTTP status of a remote rejection, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the remote rejected the request with a 4xx status, i.e. the caller sent bad data.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::RequestFailed { status, .. } if (400..500).contains(status))
    }
}
