use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    header::{HeaderName, HeaderValue},
};
use serde::Deserialize;

use crate::{Credentials, GrantError};

/// Trades an authorization code and its PKCE verifier for tokens.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    fn client_id(&self) -> &str;

    async fn exchange(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Credentials, GrantError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenRequestFormat {
    Json,
    #[default]
    Form,
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub client_id: String,
    pub token_url: String,
    pub timeout: Option<Duration>,
    pub format: TokenRequestFormat,
    pub token_params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ExchangeConfig {
    pub fn new(client_id: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            token_url: token_url.into(),
            timeout: None,
            format: TokenRequestFormat::default(),
            token_params: Vec::new(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_format(mut self, format: TokenRequestFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_params.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// OAuth2 error body returned by token endpoints (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTokenExchange {
    config: ExchangeConfig,
    http: Client,
}

impl HttpTokenExchange {
    pub fn new(config: ExchangeConfig) -> Result<Self, GrantError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    pub fn with_http_client(config: ExchangeConfig, http: Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    fn client_id(&self) -> &str {
        &self.config.client_id
    }

    async fn exchange(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Credentials, GrantError> {
        let mut payload = HashMap::new();
        payload.insert("grant_type".to_string(), "authorization_code".to_string());
        payload.insert("code".to_string(), code.to_string());
        payload.insert("client_id".to_string(), self.config.client_id.clone());
        payload.insert("redirect_uri".to_string(), redirect_uri.to_string());
        payload.insert("code_verifier".to_string(), verifier.to_string());
        for (key, value) in &self.config.token_params {
            payload.insert(key.clone(), value.clone());
        }

        tracing::debug!(token_url = %self.config.token_url, "exchanging authorization code");

        let builder = self.http.post(&self.config.token_url);
        let builder = apply_headers(builder, &self.config.headers)?;
        let response = match self.config.format {
            TokenRequestFormat::Json => builder.json(&payload).send().await?,
            TokenRequestFormat::Form => builder.form(&payload).send().await?,
        };

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "token endpoint rejected exchange");
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => GrantError::Provider {
                    status: status.as_u16(),
                    error: error.error,
                    description: error.error_description,
                },
                Err(_) => GrantError::HttpStatus {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|err| GrantError::InvalidResponse {
            message: err.to_string(),
            body,
        })
    }
}

fn apply_headers(
    mut builder: RequestBuilder,
    headers: &[(String, String)],
) -> Result<RequestBuilder, GrantError> {
    for (name, value) in headers {
        let name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| GrantError::InvalidHeader {
                name: name.clone(),
                value: value.clone(),
            })?;
        let value = HeaderValue::from_str(value).map_err(|_| GrantError::InvalidHeader {
            name: name.to_string(),
            value: value.clone(),
        })?;
        builder = builder.header(name, value);
    }
    Ok(builder)
}
