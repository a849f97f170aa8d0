use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::util::now_ts;

/// HS256 token codec for the signed-payload schemes.
///
/// Tokens are `header.payload.signature` with base64url segments WITHOUT
/// padding. The algorithm is pinned: a token whose header claims anything but
/// HS256/JWT fails verification outright, signature notwithstanding.
///
/// Expiry is part of verification. "Token valid but user unknown" is the
/// caller's error to report, never this codec's.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claim sets the codec can sign. `exp` is unix seconds.
pub trait ExpiringClaims: Serialize + DeserializeOwned {
    fn exp(&self) -> i64;
}

/// Session-token payload. Field names are part of the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(email: &str, ttl_secs: i64) -> Self {
        let now = now_ts();
        Self {
            email: email.to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

impl ExpiringClaims for SessionClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// Activation-token payload. The claim key (`act`) differs from the session
/// payload on purpose: neither token deserializes as the other, so an
/// activation token presented as a bearer credential is rejected and vice
/// versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationClaims {
    pub act: String,
    pub exp: i64,
}

impl ActivationClaims {
    pub fn new(email: &str, ttl_secs: i64) -> Self {
        Self {
            act: email.to_string(),
            exp: now_ts() + ttl_secs,
        }
    }
}

impl ExpiringClaims for ActivationClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64url_decode(s: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD.decode(s.as_bytes()).map_err(|_| TokenError::Invalid)
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    fn mac(&self, signing_input: &[u8]) -> Result<Hmac<Sha256>, TokenError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret).map_err(|_| TokenError::Invalid)?;
        mac.update(signing_input);
        Ok(mac)
    }

    pub fn sign<T: ExpiringClaims>(&self, claims: &T) -> Result<String, TokenError> {
        let header = TokenHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };

        let header_json = serde_json::to_vec(&header).map_err(|_| TokenError::Invalid)?;
        let claims_json = serde_json::to_vec(claims).map_err(|_| TokenError::Invalid)?;

        let header_b64 = b64url_encode(&header_json);
        let claims_b64 = b64url_encode(&claims_json);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();
        let sig_b64 = b64url_encode(&signature);

        Ok(format!("{signing_input}.{sig_b64}"))
    }

    /// Verify signature, header, and expiry, in that order of authority:
    /// a tampered token is `Invalid` even if it would also be expired.
    pub fn verify<T: ExpiringClaims>(&self, token: &str) -> Result<T, TokenError> {
        let token = token.replace(char::is_whitespace, "");
        let mut parts = token.split('.');
        let Some(header_b64) = parts.next() else {
            return Err(TokenError::Invalid);
        };
        let Some(payload_b64) = parts.next() else {
            return Err(TokenError::Invalid);
        };
        let Some(sig_b64) = parts.next() else {
            return Err(TokenError::Invalid);
        };
        if parts.next().is_some() {
            return Err(TokenError::Invalid);
        }

        let header_raw = b64url_decode(header_b64)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_raw).map_err(|_| TokenError::Invalid)?;
        if header.alg != "HS256" || header.typ.to_ascii_uppercase() != "JWT" {
            return Err(TokenError::Invalid);
        }

        let signing_input = format!("{header_b64}.{payload_b64}");
        let sig = b64url_decode(sig_b64)?;

        self.mac(signing_input.as_bytes())?
            .verify_slice(&sig)
            .map_err(|_| TokenError::Invalid)?;

        let payload_raw = b64url_decode(payload_b64)?;
        let claims: T = serde_json::from_slice(&payload_raw).map_err(|_| TokenError::Invalid)?;

        if claims.exp() <= now_ts() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
