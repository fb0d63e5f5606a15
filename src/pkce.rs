use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::GrantError;

const VERIFIER_BYTES: usize = 32;

pub const S256_METHOD: &str = "S256";

/// A code verifier together with the challenge sent in the authorization request.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: SecretString,
    pub challenge: String,
    pub method: String,
}

impl PkceChallenge {
    pub fn new(
        verifier: impl Into<String>,
        challenge: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            verifier: SecretString::new(verifier.into()),
            challenge: challenge.into(),
            method: method.into(),
        }
    }

    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self::new(verifier, challenge, S256_METHOD)
    }

    pub fn verifier(&self) -> &str {
        self.verifier.expose_secret()
    }
}

pub trait ChallengeGenerator: Send + Sync {
    fn generate(&self) -> Result<PkceChallenge, GrantError>;
}

/// Random verifier from the OS RNG with a SHA-256 derived challenge.
#[derive(Debug, Clone, Copy, Default)]
pub struct S256Generator;

impl ChallengeGenerator for S256Generator {
    fn generate(&self) -> Result<PkceChallenge, GrantError> {
        let mut bytes = [0u8; VERIFIER_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| GrantError::OsRng {
                message: err.to_string(),
            })?;
        Ok(PkceChallenge::from_verifier(URL_SAFE_NO_PAD.encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChallengeGenerator, PkceChallenge, S256Generator};

    #[test]
    fn generates_url_safe_pkce() {
        let pkce = S256Generator.generate().unwrap();
        assert_eq!(pkce.method, "S256");
        for value in [pkce.verifier(), pkce.challenge.as_str()] {
            assert!(!value.contains('='), "pkce values should be unpadded");
            assert!(!value.contains('+'), "pkce values should be url safe");
            assert!(!value.contains('/'), "pkce values should be url safe");
        }
    }

    #[test]
    fn derives_rfc7636_challenge() {
        // RFC 7636 Appendix B
        let pkce = PkceChallenge::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn debug_output_hides_verifier() {
        let pkce = PkceChallenge::new("super-secret-verifier", "chal", "S256");
        let rendered = format!("{pkce:?}");
        assert!(!rendered.contains("super-secret-verifier"));
        assert!(rendered.contains("chal"));
    }
}
