//! Authorization grants.
//!
//! A grant contributes parameters to the outbound authorization request,
//! picks the callback parameters it trusts out of the redirect, and turns
//! them into [`Credentials`].

use std::sync::Arc;

use url::Url;

use crate::id_token::{IdTokenDecoder, UnverifiedJwtDecoder, validate_nonce};
use crate::{
    CallbackParameters, ChallengeGenerator, Credentials, GrantDefaults, GrantError,
    PkceChallenge, RedirectComponents, ResponseType, ResponseTypes, TokenExchange,
};

#[derive(Clone)]
pub struct ImplicitGrant {
    response_types: ResponseTypes,
    nonce: Option<String>,
    decoder: Arc<dyn IdTokenDecoder>,
}

impl ImplicitGrant {
    pub fn new(response_types: impl Into<ResponseTypes>) -> Self {
        Self {
            response_types: response_types.into(),
            nonce: None,
            decoder: Arc::new(UnverifiedJwtDecoder),
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_id_token_decoder(mut self, decoder: Arc<dyn IdTokenDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn defaults(&self) -> GrantDefaults {
        let mut defaults = GrantDefaults::new();
        if let Some(nonce) = &self.nonce {
            defaults.insert("nonce", nonce.clone());
        }
        defaults
    }

    /// Tokens of the implicit flow travel in the fragment only; the query is ignored.
    pub fn values_from_redirect(&self, components: &RedirectComponents) -> CallbackParameters {
        components.fragment.clone()
    }

    pub fn credentials_from(&self, values: &CallbackParameters) -> Result<Credentials, GrantError> {
        validate_nonce(
            &self.response_types,
            values.get("id_token"),
            self.nonce.as_deref(),
            self.decoder.as_ref(),
        )?;

        if self.response_types.contains(ResponseType::Token) && !values.contains_key("access_token")
        {
            tracing::warn!("implicit grant response is missing access_token");
            return Err(GrantError::MissingAccessToken);
        }

        Ok(Credentials::from_values(values))
    }
}

impl std::fmt::Debug for ImplicitGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplicitGrant")
            .field("response_types", &self.response_types)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct PkceGrant {
    exchange: Arc<dyn TokenExchange>,
    redirect_url: Url,
    pkce: PkceChallenge,
    response_types: ResponseTypes,
    nonce: Option<String>,
    decoder: Arc<dyn IdTokenDecoder>,
}

impl PkceGrant {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        redirect_url: Url,
        pkce: PkceChallenge,
        response_types: impl Into<ResponseTypes>,
    ) -> Self {
        Self {
            exchange,
            redirect_url,
            pkce,
            response_types: response_types.into(),
            nonce: None,
            decoder: Arc::new(UnverifiedJwtDecoder),
        }
    }

    pub fn generate(
        exchange: Arc<dyn TokenExchange>,
        redirect_url: Url,
        generator: &dyn ChallengeGenerator,
        response_types: impl Into<ResponseTypes>,
    ) -> Result<Self, GrantError> {
        let pkce = generator.generate()?;
        Ok(Self::new(exchange, redirect_url, pkce, response_types))
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_id_token_decoder(mut self, decoder: Arc<dyn IdTokenDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn defaults(&self) -> GrantDefaults {
        let mut defaults = GrantDefaults::new();
        defaults.insert("code_challenge", self.pkce.challenge.clone());
        defaults.insert("code_challenge_method", self.pkce.method.clone());
        if let Some(nonce) = &self.nonce {
            defaults.insert("nonce", nonce.clone());
        }
        defaults
    }

    /// Fragment values overlaid with query values; the query wins on collision.
    pub fn values_from_redirect(&self, components: &RedirectComponents) -> CallbackParameters {
        components.fragment.clone().overlay(components.query.clone())
    }

    pub async fn credentials_from(
        &self,
        values: &CallbackParameters,
    ) -> Result<Credentials, GrantError> {
        let Some(code) = values.get("code") else {
            tracing::warn!(fields = values.len(), "authorization response carries no code");
            return Err(GrantError::AuthenticationError {
                description: values.to_diagnostic_json(),
            });
        };

        validate_nonce(
            &self.response_types,
            values.get("id_token"),
            self.nonce.as_deref(),
            self.decoder.as_ref(),
        )?;

        tracing::debug!(client_id = self.exchange.client_id(), "exchanging code with pkce verifier");
        self.exchange
            .exchange(code, self.pkce.verifier(), self.redirect_url.as_str())
            .await
            .map_err(|err| {
                if err.is_unauthorized() {
                    tracing::warn!(error = %err, "token exchange unauthorized for pkce client");
                    pkce_not_allowed(self.exchange.client_id())
                } else {
                    err
                }
            })
    }
}

fn pkce_not_allowed(client_id: &str) -> GrantError {
    GrantError::PkceNotAllowed {
        message: format!(
            "Unable to complete authentication with PKCE. Verify that client '{client_id}' is \
             registered as a 'Native' application with PKCE enabled (token endpoint \
             authentication method 'none')."
        ),
    }
}

impl std::fmt::Debug for PkceGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceGrant")
            .field("client_id", &self.exchange.client_id())
            .field("redirect_url", &self.redirect_url.as_str())
            .field("pkce", &self.pkce)
            .field("response_types", &self.response_types)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// The grant chosen for one authorization attempt.
#[derive(Debug, Clone)]
pub enum Grant {
    Implicit(ImplicitGrant),
    Pkce(PkceGrant),
}

impl Grant {
    pub fn defaults(&self) -> GrantDefaults {
        match self {
            Grant::Implicit(grant) => grant.defaults(),
            Grant::Pkce(grant) => grant.defaults(),
        }
    }

    pub fn values_from_redirect(&self, components: &RedirectComponents) -> CallbackParameters {
        match self {
            Grant::Implicit(grant) => grant.values_from_redirect(components),
            Grant::Pkce(grant) => grant.values_from_redirect(components),
        }
    }

    pub async fn credentials_from(
        &self,
        values: &CallbackParameters,
    ) -> Result<Credentials, GrantError> {
        match self {
            Grant::Implicit(grant) => grant.credentials_from(values),
            Grant::Pkce(grant) => grant.credentials_from(values).await,
        }
    }
}

impl From<ImplicitGrant> for Grant {
    fn from(grant: ImplicitGrant) -> Self {
        Grant::Implicit(grant)
    }
}

impl From<PkceGrant> for Grant {
    fn from(grant: PkceGrant) -> Self {
        Grant::Pkce(grant)
    }
}
