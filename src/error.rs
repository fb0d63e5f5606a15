use thiserror::Error;

const UNAUTHORIZED_DESCRIPTION: &str = "Unauthorized";
const UNAUTHORIZED_CLIENT: &str = "unauthorized_client";

#[derive(Debug, Error)]
pub enum GrantError {
    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header: {name}={value}")]
    InvalidHeader { name: String, value: String },

    #[error("invalid response type: {0}")]
    InvalidResponseType(String),

    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("{}", description.as_deref().unwrap_or(error.as_str()))]
    Provider {
        status: u16,
        error: String,
        description: Option<String>,
    },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, body: String },

    #[error("invalid id token: {message}")]
    InvalidIdToken { message: String },

    #[error("id token nonce validation failed")]
    InvalidIdTokenNonce,

    #[error("no access token found in authorization response")]
    MissingAccessToken,

    #[error("authentication error: {description}")]
    AuthenticationError { description: String },

    #[error("{message}")]
    PkceNotAllowed { message: String },
}

impl GrantError {
    /// Human readable description attached to an exchange failure, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            GrantError::Provider {
                description: Some(description),
                ..
            } => Some(description.as_str()),
            GrantError::Provider { error, .. } => Some(error.as_str()),
            GrantError::AuthenticationError { description } => Some(description.as_str()),
            GrantError::PkceNotAllowed { message } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether a token exchange was refused because the client may not use
    /// the authorization code grant as configured.
    pub fn is_unauthorized(&self) -> bool {
        if self.description() == Some(UNAUTHORIZED_DESCRIPTION) {
            return true;
        }
        match self {
            GrantError::Provider { status, error, .. } => {
                *status == 401 || error == UNAUTHORIZED_CLIENT
            }
            GrantError::HttpStatus { status, .. } => *status == 401,
            _ => false,
        }
    }
}
