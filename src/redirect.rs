use url::{Url, form_urlencoded};

use crate::{CallbackParameters, GrantError};

/// Key/value pairs carried by a callback URL, kept apart by where they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectComponents {
    pub fragment: CallbackParameters,
    pub query: CallbackParameters,
}

impl RedirectComponents {
    pub fn new(fragment: CallbackParameters, query: CallbackParameters) -> Self {
        Self { fragment, query }
    }

    pub fn from_url(url: &Url) -> Self {
        let query = url.query_pairs().into_owned().collect();
        let fragment = url
            .fragment()
            .map(|fragment| parse_pairs(fragment.as_bytes()))
            .unwrap_or_default();
        Self { fragment, query }
    }

    pub fn parse(callback_url: &str) -> Result<Self, GrantError> {
        let url = Url::parse(callback_url)?;
        Ok(Self::from_url(&url))
    }
}

fn parse_pairs(input: &[u8]) -> CallbackParameters {
    form_urlencoded::parse(input).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use super::RedirectComponents;
    use crate::GrantError;

    #[test]
    fn splits_fragment_and_query() {
        let components = RedirectComponents::parse(
            "https://app.example.com/callback?code=abc&state=s1#access_token=tok&token_type=Bearer",
        )
        .unwrap();

        assert_eq!(components.query.get("code"), Some("abc"));
        assert_eq!(components.query.get("state"), Some("s1"));
        assert_eq!(components.fragment.get("access_token"), Some("tok"));
        assert_eq!(components.fragment.get("token_type"), Some("Bearer"));
        assert!(!components.fragment.contains_key("code"));
    }

    #[test]
    fn last_occurrence_wins_within_a_source() {
        let components =
            RedirectComponents::parse("myapp://callback?a=1&a=2#b=x&b=y").unwrap();
        assert_eq!(components.query.get("a"), Some("2"));
        assert_eq!(components.fragment.get("b"), Some("y"));
    }

    #[test]
    fn decodes_percent_encoded_values() {
        let components = RedirectComponents::parse(
            "https://app.example.com/cb#error_description=User%20cancelled+login",
        )
        .unwrap();
        assert_eq!(
            components.fragment.get("error_description"),
            Some("User cancelled login")
        );
    }

    #[test]
    fn missing_components_are_empty() {
        let components = RedirectComponents::parse("https://app.example.com/cb").unwrap();
        assert!(components.query.is_empty());
        assert!(components.fragment.is_empty());
    }

    #[test]
    fn rejects_unparsable_url() {
        let result = RedirectComponents::parse("not a url");
        assert!(matches!(result, Err(GrantError::Url(_))));
    }
}
