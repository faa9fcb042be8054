use log::*;
use serde::Deserialize;

use crate::{
    client::{HttpRequestSpec, OpenPaymentsClient},
    config::SigningConfig,
    error::OpenPaymentsError,
    grants::AccessToken,
};

#[derive(Debug, Clone, Deserialize)]
struct RotatedToken {
    access_token: AccessToken,
}

impl OpenPaymentsClient {
    /// POST the token's management URL, authorized by the token itself. On success the old token is dead and
    /// the returned one replaces it.
    pub async fn rotate_access_token(
        &self,
        manage_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<AccessToken, OpenPaymentsError> {
        let spec = HttpRequestSpec::new(reqwest::Method::POST, manage_url).with_access_token(access_token);
        let rotated: RotatedToken = self.send(spec, Some(config), None).await?.deserialize()?;
        Ok(rotated.access_token)
    }

    /// DELETE the token's management URL. A 2xx with no body is the normal success response.
    pub async fn revoke_access_token(
        &self,
        manage_url: &str,
        access_token: &str,
        config: &SigningConfig,
    ) -> Result<(), OpenPaymentsError> {
        let spec = HttpRequestSpec::delete(manage_url).with_access_token(access_token);
        let body = self.send(spec, Some(config), None).await?;
        if !body.is_empty() {
            debug!("Token revocation returned an unexpected body: {body}");
        }
        Ok(())
    }
}
