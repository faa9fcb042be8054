use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use open_payments::OpenPaymentsError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("Not found. {0}")]
    NotFound(String),
    /// The grant needs the resource owner to interact before it can finalize. The pending grant rides along so
    /// the caller can follow its redirect.
    #[error("Grant requires user interaction to finalize")]
    GrantPending { grant: Value },
    #[error("Upstream Open Payments call failed. {0}")]
    UpstreamError(String),
    #[error("Store error. {0}")]
    StoreError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::GrantPending { .. } => StatusCode::CONFLICT,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::StoreError(_) | Self::IOError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({ "error": self.to_string() });
        if let Self::GrantPending { grant } = self {
            body["grant"] = grant.clone();
        }
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<OpenPaymentsError> for ServerError {
    fn from(e: OpenPaymentsError) -> Self {
        match e {
            OpenPaymentsError::InvalidUrl(detail) => Self::InvalidRequest(detail),
            OpenPaymentsError::KeyNotFound(_) | OpenPaymentsError::KeyUnreadable { .. } => {
                Self::ConfigurationError(e.to_string())
            },
            other => Self::UpstreamError(other.to_string()),
        }
    }
}
