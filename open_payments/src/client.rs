use std::{fmt, fmt::Display, sync::Arc};

use log::*;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{config::SigningConfig, error::OpenPaymentsError, key_store::KeyStore, signature};

/// The signed HTTP request client every Open Payments operation goes through.
///
/// Holds a shared transport and the process-wide key cache. Cheap to clone; clones share both.
#[derive(Clone)]
pub struct OpenPaymentsClient {
    http: Arc<Client>,
    keys: Arc<KeyStore>,
}

impl Default for OpenPaymentsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A single outgoing request. Constructed fresh per call, never shared.
#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub access_token: Option<String>,
}

impl HttpRequestSpec {
    pub fn new(method: Method, url: &str) -> Self {
        Self { method, url: url.to_string(), headers: Vec::new(), body: None, access_token: None }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str, body: Value) -> Self {
        let mut spec = Self::new(Method::POST, url);
        spec.body = Some(body);
        spec
    }

    pub fn delete(url: &str) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Options for the `get`/`post` convenience wrappers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions<'a> {
    pub access_token: Option<&'a str>,
    pub config: Option<&'a SigningConfig>,
    /// Explicit signing override. `None` leaves the decision to the standard rule.
    pub sign: Option<bool>,
}

/// A normalized response body.
///
/// Empty bodies become `Empty`; bodies that parse as JSON become `Json`; anything else is kept verbatim as
/// `Text`, because some endpoints return plain-text error bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Empty,
    Json(Value),
    Text(String),
}

impl ParsedBody {
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The JSON value, or an `UnexpectedResponse` error describing what arrived instead.
    pub fn into_json(self) -> Result<Value, OpenPaymentsError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Empty => Err(OpenPaymentsError::UnexpectedResponse("Expected a JSON body, got no content".into())),
            Self::Text(text) => {
                Err(OpenPaymentsError::UnexpectedResponse(format!("Expected a JSON body, got: {text}")))
            },
        }
    }

    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, OpenPaymentsError> {
        let value = self.into_json()?;
        serde_json::from_value(value).map_err(|e| OpenPaymentsError::UnexpectedResponse(e.to_string()))
    }
}

impl Display for ParsedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<no content>"),
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl OpenPaymentsClient {
    pub fn new() -> Self {
        Self { http: Arc::new(Client::new()), keys: Arc::new(KeyStore::new()) }
    }

    /// Build a client around an existing key store, so tests can control cache lifetime.
    pub fn with_key_store(keys: Arc<KeyStore>) -> Self {
        Self { http: Arc::new(Client::new()), keys }
    }

    /// Send a request, signing it when the decision rule says so, and normalize the response.
    ///
    /// The signing decision, in priority order:
    /// 1. An explicit `force_sign` (true or false) is always honored.
    /// 2. Otherwise, a request carrying an access token is signed.
    /// 3. Otherwise, everything except GET is signed.
    pub async fn send(
        &self,
        spec: HttpRequestSpec,
        config: Option<&SigningConfig>,
        force_sign: Option<bool>,
    ) -> Result<ParsedBody, OpenPaymentsError> {
        let HttpRequestSpec { method, url, mut headers, body, access_token } = spec;
        let parsed_url =
            Url::parse(&url).map_err(|e| OpenPaymentsError::InvalidUrl(format!("{url}: {e}")))?;

        if header_value(&headers, "accept").is_none() {
            headers.push(("Accept".to_string(), "application/json".to_string()));
        }
        if let Some(token) = &access_token {
            set_header(&mut headers, "Authorization", format!("GNAP {token}"));
        }
        // All-or-nothing: the body is fully serialized before anything goes on the wire.
        let body_string = body.as_ref().map(Value::to_string);

        if should_sign(&method, access_token.is_some(), force_sign) {
            let config = config.ok_or(OpenPaymentsError::SigningConfigMissing)?;
            let pem = self.keys.load(&config.private_key_path)?;
            let key = signature::parse_private_key(&pem).map_err(|reason| OpenPaymentsError::KeyUnreadable {
                path: config.private_key_path.clone(),
                reason,
            })?;
            let sig_headers =
                signature::sign_request(method.as_str(), &url, &headers, body_string.as_deref(), &key, &config.key_id)?;
            for (name, value) in sig_headers.into_header_pairs() {
                set_header(&mut headers, &name, value);
            }
            enforce_key_id(&mut headers, &config.key_id);
        } else if body_string.is_some() && header_value(&headers, "content-type").is_none() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        trace!("Sending {method} {url}");
        let mut request = self.http.request(method.clone(), parsed_url);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        if let Some(body) = body_string {
            request = request.body(body);
        }
        let response = request.send().await.map_err(|e| OpenPaymentsError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| OpenPaymentsError::Transport(e.to_string()))?;
        let parsed = ParsedBody::from_text(&text);
        if status.is_success() {
            trace!("{method} {url} succeeded with {status}");
            Ok(parsed)
        } else {
            Err(OpenPaymentsError::RequestFailed { status: status.as_u16(), body: parsed })
        }
    }

    /// GET the given URL. Unsigned by default, matching the public endpoints it is used against; pass
    /// `options.sign` to override.
    pub async fn get(&self, url: &str, options: RequestOptions<'_>) -> Result<ParsedBody, OpenPaymentsError> {
        let mut spec = HttpRequestSpec::get(url);
        if let Some(token) = options.access_token {
            spec = spec.with_access_token(token);
        }
        let sign = Some(options.sign.unwrap_or(false));
        self.send(spec, options.config, sign).await
    }

    /// POST a JSON body to the given URL, following the standard signing rule.
    pub async fn post(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions<'_>,
    ) -> Result<ParsedBody, OpenPaymentsError> {
        let mut spec = HttpRequestSpec::post(url, body);
        if let Some(token) = options.access_token {
            spec = spec.with_access_token(token);
        }
        self.send(spec, options.config, options.sign).await
    }
}

fn should_sign(method: &Method, has_access_token: bool, force_sign: Option<bool>) -> bool {
    match force_sign {
        Some(sign) => sign,
        None => has_access_token || *method != Method::GET,
    }
}

/// The configured keyId must appear in the emitted Signature-Input, exactly. A missing or different keyid is
/// overwritten.
fn enforce_key_id(headers: &mut [(String, String)], key_id: &str) {
    if let Some(value) = headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case("signature-input")) {
        match signature::key_id_from_signature_input(&value.1) {
            Some(existing) if existing == key_id => {},
            _ => value.1 = signature::replace_key_id(&value.1, key_id),
        }
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        Some(existing) => existing.1 = value,
        None => headers.push((name.to_string(), value)),
    }
}

/// Append a path segment to a base URL, tolerating trailing slashes on the base.
pub(crate) fn join_url(base: &str, segment: &str) -> Result<Url, OpenPaymentsError> {
    let mut url = Url::parse(base).map_err(|e| OpenPaymentsError::InvalidUrl(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| OpenPaymentsError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}
