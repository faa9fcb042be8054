//! # GNAP grant lifecycle
//!
//! A grant request either finalizes immediately (the response carries a usable access token) or comes back
//! pending with a `continue` descriptor. Pending grants require an out-of-band interaction (a browser redirect
//! where the resource owner consents) before [OpenPaymentsClient::continue_grant] can exchange the continuation
//! token for the real one. Outgoing-payment grants are the only kind that routinely needs interaction; incoming
//! payment and quote grants finalize on the spot.
//!
//! Classification is deliberately centralised in [Grant::classify] and applied to every grant-shaped response:
//! finalized is checked first, so a response carrying both an access token and a continue descriptor counts as
//! finalized.

use op_common::Amount;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{HttpRequestSpec, OpenPaymentsClient},
    config::SigningConfig,
    error::OpenPaymentsError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessType {
    IncomingPayment,
    Quote,
    OutgoingPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    Create,
    Read,
    List,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessScope {
    #[serde(rename = "type")]
    pub access_type: AccessType,
    pub actions: Vec<AccessAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<AccessLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl AccessScope {
    pub fn new(access_type: AccessType, actions: Vec<AccessAction>) -> Self {
        Self { access_type, actions, limits: None, identifier: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLimits {
    pub debit_amount: Amount,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrantRequest {
    pub access_token: AccessTokenRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interact: Option<InteractRequest>,
    /// The requesting client's wallet address URL. The authorization server resolves it to the client's
    /// published keys to verify the request signature.
    pub client: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenRequest {
    pub access: Vec<AccessScope>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractRequest {
    pub start: Vec<String>,
}

impl InteractRequest {
    pub fn redirect() -> Self {
        Self { start: vec!["redirect".to_string()] }
    }
}

impl GrantRequest {
    pub fn new(config: &SigningConfig, access: Vec<AccessScope>) -> Self {
        Self { access_token: AccessTokenRequest { access }, interact: None, client: config.wallet_address_url.clone() }
    }

    pub fn with_redirect_interaction(mut self) -> Self {
        self.interact = Some(InteractRequest::redirect());
        self
    }
}

//--------------------------------------     Grant responses       ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    /// Token management URL, used for rotation and revocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedGrant {
    pub access_token: AccessToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingGrant {
    #[serde(rename = "continue")]
    pub continuation: ContinueDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interact: Option<InteractResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueDescriptor {
    pub uri: String,
    pub access_token: ContinueToken,
    /// Seconds the caller should wait before continuing, when the server supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueToken {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractResponse {
    /// Where to send the resource owner to consent.
    pub redirect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
}

/// A classified grant response. Exactly one of the two states; see [Grant::classify].
#[derive(Debug, Clone)]
pub enum Grant {
    Finalized(FinalizedGrant),
    Pending(PendingGrant),
}

impl Grant {
    /// Classify a raw grant response. Finalized iff a non-empty `access_token.value` is present (checked
    /// first); otherwise pending iff a `continue` descriptor is present; anything else is a protocol violation.
    pub fn classify(value: Value) -> Result<Grant, OpenPaymentsError> {
        let token = value.get("access_token").and_then(|t| t.get("value")).and_then(Value::as_str);
        if token.is_some_and(|v| !v.is_empty()) {
            let grant = serde_json::from_value::<FinalizedGrant>(value)
                .map_err(|e| OpenPaymentsError::UnexpectedResponse(format!("Malformed finalized grant: {e}")))?;
            return Ok(Grant::Finalized(grant));
        }
        if value.get("continue").is_some() {
            let grant = serde_json::from_value::<PendingGrant>(value)
                .map_err(|e| OpenPaymentsError::UnexpectedResponse(format!("Malformed pending grant: {e}")))?;
            return Ok(Grant::Pending(grant));
        }
        Err(OpenPaymentsError::GrantNotFinalized)
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Grant::Finalized(_))
    }

    /// Unwrap the finalized state, failing with `GrantNotFinalized` if interaction is still outstanding.
    pub fn into_finalized(self) -> Result<FinalizedGrant, OpenPaymentsError> {
        match self {
            Grant::Finalized(grant) => Ok(grant),
            Grant::Pending(_) => Err(OpenPaymentsError::GrantNotFinalized),
        }
    }
}

//--------------------------------------     Grant operations       --------------------------------------------------

impl OpenPaymentsClient {
    /// Submit a grant request to an authorization server and classify the response.
    pub async fn request_grant(
        &self,
        auth_server_url: &str,
        request: &GrantRequest,
        config: &SigningConfig,
    ) -> Result<Grant, OpenPaymentsError> {
        let body = serde_json::to_value(request)
            .map_err(|e| OpenPaymentsError::UnexpectedResponse(format!("Could not serialize grant request: {e}")))?;
        let spec = HttpRequestSpec::post(auth_server_url, body);
        let response = self.send(spec, Some(config), None).await?;
        Grant::classify(response.into_json()?)
    }

    /// Grant for creating and managing incoming payments. Expected to finalize without interaction.
    pub async fn request_incoming_payment_grant(
        &self,
        auth_server_url: &str,
        config: &SigningConfig,
    ) -> Result<Grant, OpenPaymentsError> {
        let scope = AccessScope::new(AccessType::IncomingPayment, vec![
            AccessAction::Create,
            AccessAction::Read,
            AccessAction::List,
            AccessAction::Complete,
        ]);
        self.request_grant(auth_server_url, &GrantRequest::new(config, vec![scope]), config).await
    }

    /// Grant for creating and reading quotes. Expected to finalize without interaction.
    pub async fn request_quote_grant(
        &self,
        auth_server_url: &str,
        config: &SigningConfig,
    ) -> Result<Grant, OpenPaymentsError> {
        let scope = AccessScope::new(AccessType::Quote, vec![AccessAction::Create, AccessAction::Read]);
        self.request_grant(auth_server_url, &GrantRequest::new(config, vec![scope]), config).await
    }

    /// Grant for spending from `wallet_address_id`, limited to `debit_amount`. With `require_interaction` the
    /// response is expected to come back pending; the caller must redirect the owner and then continue.
    pub async fn request_outgoing_payment_grant(
        &self,
        auth_server_url: &str,
        wallet_address_id: &str,
        debit_amount: Amount,
        config: &SigningConfig,
        require_interaction: bool,
    ) -> Result<Grant, OpenPaymentsError> {
        let scope = AccessScope {
            access_type: AccessType::OutgoingPayment,
            actions: vec![AccessAction::Create, AccessAction::Read, AccessAction::List],
            limits: Some(AccessLimits { debit_amount }),
            identifier: Some(wallet_address_id.to_string()),
        };
        let mut request = GrantRequest::new(config, vec![scope]);
        if require_interaction {
            request = request.with_redirect_interaction();
        }
        self.request_grant(auth_server_url, &request, config).await
    }

    /// Continue a pending grant after the owner has interacted. The continuation must produce a finalized
    /// grant; a still-pending response is a protocol violation, not a retry case.
    pub async fn continue_grant(
        &self,
        continue_uri: &str,
        continue_access_token: &str,
        config: &SigningConfig,
    ) -> Result<FinalizedGrant, OpenPaymentsError> {
        let spec = HttpRequestSpec::new(reqwest::Method::POST, continue_uri).with_access_token(continue_access_token);
        let response = self.send(spec, Some(config), None).await?;
        Grant::classify(response.into_json()?)?.into_finalized()
    }

    /// Revoke a grant via its management URL. Revoking an already-revoked grant is not an error the caller
    /// needs to distinguish.
    pub async fn revoke_grant(
        &self,
        grant_manage_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<(), OpenPaymentsError> {
        let spec = HttpRequestSpec::delete(grant_manage_url).with_access_token(access_token);
        self.send(spec, Some(config), None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn finalized_grant_classification() {
        let grant = Grant::classify(json!({"access_token": {"value": "tok", "manage": "https://as/token/1"}}))
            .expect("Failed to classify");
        match grant {
            Grant::Finalized(g) => {
                assert_eq!(g.access_token.value, "tok");
                assert_eq!(g.access_token.manage.as_deref(), Some("https://as/token/1"));
            },
            Grant::Pending(_) => panic!("Expected a finalized grant"),
        }
    }

    #[test]
    fn pending_grant_classification() {
        let grant = Grant::classify(json!({
            "continue": {"uri": "https://as/continue/1", "access_token": {"value": "c"}},
            "interact": {"redirect": "https://as/interact/1"}
        }))
        .expect("Failed to classify");
        match grant {
            Grant::Pending(g) => {
                assert_eq!(g.continuation.uri, "https://as/continue/1");
                assert_eq!(g.continuation.access_token.value, "c");
                assert_eq!(g.interact.unwrap().redirect, "https://as/interact/1");
            },
            Grant::Finalized(_) => panic!("Expected a pending grant"),
        }
    }

    #[test]
    fn both_fields_classify_as_finalized() {
        let grant = Grant::classify(json!({
            "access_token": {"value": "tok"},
            "continue": {"uri": "https://as/continue/1", "access_token": {"value": "c"}}
        }))
        .expect("Failed to classify");
        assert!(grant.is_finalized());
    }

    #[test]
    fn empty_token_value_is_not_finalized() {
        let grant = Grant::classify(json!({
            "access_token": {"value": ""},
            "continue": {"uri": "https://as/continue/1", "access_token": {"value": "c"}}
        }))
        .expect("Failed to classify");
        assert!(!grant.is_finalized());
    }

    #[test]
    fn neither_shape_is_a_protocol_violation() {
        let err = Grant::classify(json!({"unexpected": true})).unwrap_err();
        assert!(matches!(err, OpenPaymentsError::GrantNotFinalized));
    }

    #[test]
    fn outgoing_grant_request_shape() {
        let config = SigningConfig::new("https://ilp.example/shop", "key.pem", "kid-1");
        let scope = AccessScope {
            access_type: AccessType::OutgoingPayment,
            actions: vec![AccessAction::Create, AccessAction::Read, AccessAction::List],
            limits: Some(AccessLimits {
                debit_amount: Amount::new(op_common::MinorUnits::from(1000), "USD", 2),
            }),
            identifier: Some("https://ilp.example/buyer".to_string()),
        };
        let request = GrantRequest::new(&config, vec![scope]).with_redirect_interaction();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["client"], "https://ilp.example/shop");
        assert_eq!(value["interact"]["start"][0], "redirect");
        let access = &value["access_token"]["access"][0];
        assert_eq!(access["type"], "outgoing-payment");
        assert_eq!(access["actions"], json!(["create", "read", "list"]));
        assert_eq!(access["limits"]["debitAmount"]["value"], "1000");
        assert_eq!(access["identifier"], "https://ilp.example/buyer");
    }

    #[test]
    fn incoming_scope_omits_optional_fields() {
        let scope = AccessScope::new(AccessType::IncomingPayment, vec![
            AccessAction::Create,
            AccessAction::Read,
            AccessAction::List,
            AccessAction::Complete,
        ]);
        let value = serde_json::to_value(&scope).unwrap();
        assert_eq!(value["type"], "incoming-payment");
        assert!(value.get("limits").is_none());
        assert!(value.get("identifier").is_none());
    }
}
