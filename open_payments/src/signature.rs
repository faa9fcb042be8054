//! HTTP message signatures (RFC 9421) for Open Payments requests.
//!
//! The authorization and resource servers verify an Ed25519 signature over a canonical signature base built
//! from the request. Covered components are always `@method` and `@target-uri`, plus `authorization` when the
//! request carries a token, plus `content-digest`/`content-length`/`content-type` when it carries a body. The
//! signature label is `sig1` and the digest algorithm is sha-512, matching what the wallet providers verify.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use ed25519_dalek::{pkcs8::DecodePrivateKey, Signer, SigningKey};
use sha2::{Digest, Sha512};

use crate::error::OpenPaymentsError;

/// The headers produced by signing a request. The body headers are only present when the request has a body,
/// because they are covered by the signature and must reach the wire exactly as signed.
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    pub signature: String,
    pub signature_input: String,
    pub content_digest: Option<String>,
    pub content_length: Option<String>,
    pub content_type: Option<String>,
}

impl SignatureHeaders {
    /// Flatten into (name, value) pairs ready to merge into a request's header list.
    pub fn into_header_pairs(self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Signature".to_string(), self.signature),
            ("Signature-Input".to_string(), self.signature_input),
        ];
        if let Some(digest) = self.content_digest {
            pairs.push(("Content-Digest".to_string(), digest));
        }
        if let Some(length) = self.content_length {
            pairs.push(("Content-Length".to_string(), length));
        }
        if let Some(content_type) = self.content_type {
            pairs.push(("Content-Type".to_string(), content_type));
        }
        pairs
    }
}

/// Parse an Ed25519 private key from its PKCS#8 PEM encoding. Returns the parse failure as a plain string so
/// the caller can attach the file path it loaded the PEM from.
pub fn parse_private_key(pem: &str) -> Result<SigningKey, String> {
    SigningKey::from_pkcs8_pem(pem).map_err(|e| format!("Not a valid PKCS#8 Ed25519 private key. {e}"))
}

/// Sign a request and return the headers to attach.
///
/// `headers` is the outgoing header list as assembled so far; it is consulted for the `Authorization` value
/// (covered when present) and for an explicit `Content-Type` override.
pub fn sign_request(
    method: &str,
    url: &str,
    headers: &[(String, String)],
    body: Option<&str>,
    key: &SigningKey,
    key_id: &str,
) -> Result<SignatureHeaders, OpenPaymentsError> {
    let created = Utc::now().timestamp();
    sign_request_at(method, url, headers, body, key, key_id, created)
}

/// As [sign_request], with an explicit `created` timestamp. Split out so tests can produce stable output.
pub(crate) fn sign_request_at(
    method: &str,
    url: &str,
    headers: &[(String, String)],
    body: Option<&str>,
    key: &SigningKey,
    key_id: &str,
    created: i64,
) -> Result<SignatureHeaders, OpenPaymentsError> {
    let authorization = header_value(headers, "authorization");
    let content_digest = body.map(content_digest_sha512);
    let content_length = body.map(|b| b.len().to_string());
    let content_type = body.map(|_| {
        header_value(headers, "content-type").map(str::to_string).unwrap_or_else(|| "application/json".to_string())
    });

    let mut components: Vec<(&str, String)> =
        vec![("@method", method.to_uppercase()), ("@target-uri", url.to_string())];
    if let Some(auth) = authorization {
        components.push(("authorization", auth.to_string()));
    }
    if let Some(digest) = &content_digest {
        components.push(("content-digest", digest.clone()));
    }
    if let Some(length) = &content_length {
        components.push(("content-length", length.clone()));
    }
    if let Some(ct) = &content_type {
        components.push(("content-type", ct.clone()));
    }

    let component_names =
        components.iter().map(|(name, _)| format!("\"{name}\"")).collect::<Vec<_>>().join(" ");
    // keyid comes last so a keyid correction never clobbers the other parameters.
    let params = format!("({component_names});created={created};alg=\"ed25519\";keyid=\"{key_id}\"");

    let mut base_lines = components
        .iter()
        .map(|(name, value)| format!("\"{name}\": {value}"))
        .collect::<Vec<_>>();
    base_lines.push(format!("\"@signature-params\": {params}"));
    let signature_base = base_lines.join("\n");

    let signature = key
        .try_sign(signature_base.as_bytes())
        .map_err(|e| OpenPaymentsError::SigningError(e.to_string()))?;
    let encoded = BASE64.encode(signature.to_bytes());

    Ok(SignatureHeaders {
        signature: format!("sig1=:{encoded}:"),
        signature_input: format!("sig1={params}"),
        content_digest,
        content_length,
        content_type,
    })
}

/// `Content-Digest` header value over the serialized body.
pub fn content_digest_sha512(body: &str) -> String {
    let digest = Sha512::digest(body.as_bytes());
    format!("sha-512=:{}:", BASE64.encode(digest))
}

/// Extract the `keyid` parameter from a `Signature-Input` header value.
pub fn key_id_from_signature_input(input: &str) -> Option<String> {
    input
        .split(';')
        .find_map(|part| part.trim().strip_prefix("keyid="))
        .map(|value| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Rewrite (or append) the `keyid` parameter of a `Signature-Input` header value.
pub fn replace_key_id(input: &str, key_id: &str) -> String {
    match input.split_once(";keyid=") {
        Some((base, _)) => format!("{base};keyid=\"{key_id}\""),
        None => format!("{input};keyid=\"{key_id}\""),
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}
