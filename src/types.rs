use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GrantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseType {
    Code,
    Token,
    IdToken,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
            ResponseType::IdToken => "id_token",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = GrantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "code" => Ok(ResponseType::Code),
            "token" => Ok(ResponseType::Token),
            "id_token" => Ok(ResponseType::IdToken),
            other => Err(GrantError::InvalidResponseType(other.to_string())),
        }
    }
}

/// The set of response kinds requested from the authorization endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTypes(BTreeSet<ResponseType>);

impl ResponseTypes {
    pub fn new(types: impl IntoIterator<Item = ResponseType>) -> Self {
        Self(types.into_iter().collect())
    }

    pub fn contains(&self, response_type: ResponseType) -> bool {
        self.0.contains(&response_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = ResponseType> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ResponseType> for ResponseTypes {
    fn from_iter<I: IntoIterator<Item = ResponseType>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<ResponseType> for ResponseTypes {
    fn from(response_type: ResponseType) -> Self {
        Self::new([response_type])
    }
}

impl FromStr for ResponseTypes {
    type Err = GrantError;

    /// Parses a space separated `response_type` value such as `code id_token`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.split_whitespace().map(ResponseType::from_str).collect()
    }
}

impl fmt::Display for ResponseTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|kind| kind.as_str()).collect();
        f.write_str(&names.join(" "))
    }
}

/// String parameters keyed by name, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackParameters(BTreeMap<String, String>);

/// Extra parameters a grant contributes to the authorization request.
pub type GrantDefaults = CallbackParameters;

impl CallbackParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Copies every pair of `other` into `self`; `other` wins on collision.
    pub fn overlay(mut self, other: CallbackParameters) -> Self {
        self.0.extend(other.0);
        self
    }

    /// JSON object rendering used as the payload of diagnostic errors.
    pub fn to_diagnostic_json(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
            .collect();
        serde_json::Value::Object(object).to_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for CallbackParameters {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Credentials {
    /// Builds credentials from the fields carried by a redirect.
    pub fn from_values(values: &CallbackParameters) -> Self {
        let mut credentials = Self::default();
        for (key, value) in values.iter() {
            let owned = Some(value.to_string());
            match key {
                "access_token" => credentials.access_token = owned,
                "token_type" => credentials.token_type = owned,
                "id_token" => credentials.id_token = owned,
                "refresh_token" => credentials.refresh_token = owned,
                "scope" => credentials.scope = owned,
                "expires_in" => match value.parse::<u64>() {
                    Ok(seconds) => credentials.expires_in = Some(seconds),
                    Err(_) => {
                        credentials.extra.insert(
                            key.to_string(),
                            serde_json::Value::String(value.to_string()),
                        );
                    }
                },
                _ => {
                    credentials
                        .extra
                        .insert(key.to_string(), serde_json::Value::String(value.to_string()));
                }
            }
        }
        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_separated_response_types() {
        let types: ResponseTypes = "code id_token".parse().unwrap();
        assert!(types.contains(ResponseType::Code));
        assert!(types.contains(ResponseType::IdToken));
        assert!(!types.contains(ResponseType::Token));
        assert_eq!(types.to_string(), "code id_token");
    }

    #[test]
    fn rejects_unknown_response_type() {
        let result = "code device".parse::<ResponseTypes>();
        assert!(matches!(result, Err(GrantError::InvalidResponseType(name)) if name == "device"));
    }

    #[test]
    fn overlay_prefers_incoming_values() {
        let base: CallbackParameters = [("a", "1"), ("c", "4")].into_iter().collect();
        let top: CallbackParameters = [("a", "2"), ("b", "3")].into_iter().collect();
        let merged = base.overlay(top);

        let expected: CallbackParameters =
            [("a", "2"), ("b", "3"), ("c", "4")].into_iter().collect();
        assert_eq!(merged, expected);
    }

    #[test]
    fn diagnostic_json_round_trips_to_a_string_map() {
        let values: CallbackParameters = [
            ("error", "access_denied"),
            ("error_description", "User said \"no\""),
        ]
        .into_iter()
        .collect();

        let parsed: BTreeMap<String, String> =
            serde_json::from_str(&values.to_diagnostic_json()).unwrap();
        assert_eq!(parsed.get("error").map(String::as_str), Some("access_denied"));
        assert_eq!(
            parsed.get("error_description").map(String::as_str),
            Some("User said \"no\"")
        );
        assert_eq!(CallbackParameters::new().to_diagnostic_json(), "{}");
    }

    #[test]
    fn credentials_from_values_maps_known_fields() {
        let values: CallbackParameters = [
            ("access_token", "abc"),
            ("token_type", "Bearer"),
            ("expires_in", "3600"),
            ("state", "xyz"),
        ]
        .into_iter()
        .collect();

        let credentials = Credentials::from_values(&values);
        assert_eq!(credentials.access_token.as_deref(), Some("abc"));
        assert_eq!(credentials.token_type.as_deref(), Some("Bearer"));
        assert_eq!(credentials.expires_in, Some(3600));
        assert_eq!(credentials.extra.get("state"), Some(&serde_json::json!("xyz")));
        assert!(credentials.id_token.is_none());
    }

    #[test]
    fn credentials_keep_non_numeric_expiry_as_extra() {
        let values: CallbackParameters = [("expires_in", "soon")].into_iter().collect();
        let credentials = Credentials::from_values(&values);
        assert_eq!(credentials.expires_in, None);
        assert_eq!(credentials.extra.get("expires_in"), Some(&serde_json::json!("soon")));
    }

    #[test]
    fn credentials_deserialize_token_endpoint_body() {
        let body = r#"{"access_token":"at","token_type":"Bearer","expires_in":86400,"id_token":"it","custom":1}"#;
        let credentials: Credentials = serde_json::from_str(body).unwrap();
        assert_eq!(credentials.access_token.as_deref(), Some("at"));
        assert_eq!(credentials.expires_in, Some(86400));
        assert_eq!(credentials.id_token.as_deref(), Some("it"));
        assert_eq!(credentials.extra.get("custom"), Some(&serde_json::json!(1)));
    }
}
