//! OAuth 2.0 authorization-response handling.
//!
//! Turns the parameters an identity provider sends back to the redirect URI
//! into [`Credentials`], for the Implicit grant and for the Authorization Code
//! grant with PKCE. Opening the browser and capturing the callback are left to
//! the caller.

mod error;
mod exchange;
mod grant;
mod id_token;
mod pkce;
mod redirect;
mod types;

pub use error::GrantError;
pub use exchange::{ExchangeConfig, HttpTokenExchange, TokenExchange, TokenRequestFormat};
pub use grant::{Grant, ImplicitGrant, PkceGrant};
pub use id_token::{DecodedIdToken, IdTokenDecoder, UnverifiedJwtDecoder, validate_nonce};
pub use pkce::{ChallengeGenerator, PkceChallenge, S256_METHOD, S256Generator};
pub use redirect::RedirectComponents;
pub use types::{CallbackParameters, Credentials, GrantDefaults, ResponseType, ResponseTypes};
