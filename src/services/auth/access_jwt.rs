use std::{error::Error as StdError, fmt, str::FromStr};

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

// Errors returned by access-token verification.
#[derive(Debug)]
pub enum AccessJwtError {
    Key(String),
    Jwt(jsonwebtoken::errors::Error),
    EmptyClaim(&'static str),
}

impl fmt::Display for AccessJwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(e) => write!(f, "invalid verification key: {}", e),
            Self::Jwt(e) => write!(f, "jwt verification failed: {}", e),
            Self::EmptyClaim(name) => write!(f, "empty '{}' claim", name),
        }
    }
}

impl StdError for AccessJwtError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AccessJwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Signature algorithms accepted for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAlgorithm {
    Rs256,
    Es256,
    EdDsa,
    Hs256,
}

impl TokenAlgorithm {
    fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Rs256 => Algorithm::RS256,
            Self::Es256 => Algorithm::ES256,
            Self::EdDsa => Algorithm::EdDSA,
            Self::Hs256 => Algorithm::HS256,
        }
    }

    pub fn uses_shared_secret(self) -> bool {
        matches!(self, Self::Hs256)
    }
}

impl FromStr for TokenAlgorithm {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RS256" => Ok(Self::Rs256),
            "ES256" => Ok(Self::Es256),
            "EDDSA" => Ok(Self::EdDsa),
            "HS256" => Ok(Self::Hs256),
            _ => Err(()),
        }
    }
}

/// The claim set of a token whose signature, issuer, audience and expiry
/// have been checked.
///
/// Kept as the raw JSON object: which claims matter (roles, email, ...) is
/// decided by the consumers, not by the verifier.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct VerifiedClaims(Map<String, Value>);

impl VerifiedClaims {
    /// Wrap claims that were verified elsewhere.
    pub fn from_map(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim's value when it is a JSON string.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.string("sub")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Value> for VerifiedClaims {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Access-token verifier.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenVerifier {
    algorithm: TokenAlgorithm,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenVerifier")
            .field("algorithm", &self.algorithm)
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    /// `key` is a PEM public key, or the shared secret for HS256.
    pub fn new(
        algorithm: TokenAlgorithm,
        key: &str,
        issuer: &str,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Result<Self, AccessJwtError> {
        let decoding_key = match algorithm {
            TokenAlgorithm::Rs256 => DecodingKey::from_rsa_pem(key.as_bytes()),
            TokenAlgorithm::Es256 => DecodingKey::from_ec_pem(key.as_bytes()),
            TokenAlgorithm::EdDsa => DecodingKey::from_ed_pem(key.as_bytes()),
            TokenAlgorithm::Hs256 => {
                if key.is_empty() {
                    return Err(AccessJwtError::Key("empty shared secret".into()));
                }
                Ok(DecodingKey::from_secret(key.as_bytes()))
            }
        }
        .map_err(|e| AccessJwtError::Key(e.to_string()))?;

        let mut validation = Validation::new(algorithm.jwt_algorithm());
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation.leeway = leeway_seconds;

        Ok(Self {
            algorithm,
            decoding_key,
            validation,
        })
    }

    /// Verify a compact JWT and return its claim set.
    ///
    /// `jsonwebtoken::Validation` checks signature, `exp`, `iss` and (when
    /// configured) `aud`. A `sub` claim, when present, must not be blank.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, AccessJwtError> {
        let data = jsonwebtoken::decode::<VerifiedClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.get("sub").is_some() && claims.subject().is_none_or(|s| s.trim().is_empty()) {
            return Err(AccessJwtError::EmptyClaim("sub"));
        }

        Ok(claims)
    }

    pub fn algorithm(&self) -> TokenAlgorithm {
        self.algorithm
    }
}
