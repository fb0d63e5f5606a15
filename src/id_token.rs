//! ID token nonce binding.
//!
//! Only the claims are read here; signature verification belongs to a
//! separate stage.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};

use crate::{GrantError, ResponseType, ResponseTypes};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedIdToken {
    claims: Map<String, Value>,
}

impl DecodedIdToken {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// String valued claim by name.
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }
}

pub trait IdTokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<DecodedIdToken, GrantError>;
}

/// Reads the claims of a JWT without checking its signature or expiry.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedJwtDecoder;

impl IdTokenDecoder for UnverifiedJwtDecoder {
    fn decode(&self, token: &str) -> Result<DecodedIdToken, GrantError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|err| GrantError::InvalidIdToken {
                message: err.to_string(),
            })?;
        Ok(DecodedIdToken::new(data.claims))
    }
}

/// Checks that the `nonce` claim of `id_token` equals `expected_nonce`.
///
/// Succeeds unconditionally when no ID token was requested.
pub fn validate_nonce(
    response_types: &ResponseTypes,
    id_token: Option<&str>,
    expected_nonce: Option<&str>,
    decoder: &dyn IdTokenDecoder,
) -> Result<(), GrantError> {
    if !response_types.contains(ResponseType::IdToken) {
        return Ok(());
    }

    let (Some(id_token), Some(expected_nonce)) = (id_token, expected_nonce) else {
        tracing::warn!(
            has_id_token = id_token.is_some(),
            has_nonce = expected_nonce.is_some(),
            "id token nonce validation failed: missing input"
        );
        return Err(GrantError::InvalidIdTokenNonce);
    };

    let decoded = decoder.decode(id_token).map_err(|err| {
        tracing::warn!(error = %err, "id token nonce validation failed: undecodable token");
        GrantError::InvalidIdTokenNonce
    })?;

    if decoded.claim("nonce") == Some(expected_nonce) {
        Ok(())
    } else {
        tracing::warn!("id token nonce validation failed: claim mismatch");
        Err(GrantError::InvalidIdTokenNonce)
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: serde_json::Value) -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
