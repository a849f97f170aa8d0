use std::sync::Arc;

use entity::user;

use crate::store::CredentialStore;
use crate::token::{SessionClaims, TokenCodec};

/// The acting identity of a request. Anything short of a verified session
/// token resolving to an existing user is `Anonymous`.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(user::Model),
}

impl Identity {
    pub fn user(&self) -> Option<&user::Model> {
        match self {
            Identity::User(u) => Some(u),
            Identity::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
/// Wrong scheme keyword or wrong segment count yields `None`, not an error.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let parts: Vec<&str> = header?.split_whitespace().collect();
    let [scheme, token] = parts.as_slice() else {
        return None;
    };
    if *scheme != "Bearer" {
        return None;
    }
    Some(token)
}

/// Resolves request identities on demand. Handlers that never ask for an
/// identity never touch the store; ones that do pay for one lookup.
///
/// Every failure mode — missing header, malformed header, bad signature,
/// expired token, user deleted since issuance, even a store hiccup — quietly
/// downgrades to `Anonymous`. Token problems are never surfaced to the
/// caller; unauthenticated reads stay uniform.
#[derive(Clone)]
pub struct IdentityResolver {
    codec: TokenCodec,
    store: Arc<dyn CredentialStore>,
}

impl IdentityResolver {
    pub fn new(codec: TokenCodec, store: Arc<dyn CredentialStore>) -> Self {
        Self { codec, store }
    }

    pub async fn resolve(&self, authorization: Option<&str>) -> Identity {
        let Some(token) = bearer_token(authorization) else {
            return Identity::Anonymous;
        };

        let Ok(claims) = self.codec.verify::<SessionClaims>(token) else {
            return Identity::Anonymous;
        };

        match self.store.find_by_email(&claims.email).await {
            Ok(Some(user)) => Identity::User(user),
            Ok(None) => Identity::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "identity lookup failed, treating request as anonymous");
                Identity::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_header() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_header() {
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn wrong_scheme_keyword() {
        assert_eq!(bearer_token(Some("JWT abc.def.ghi")), None);
        assert_eq!(bearer_token(Some("bearer abc.def.ghi")), None);
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")), None);
    }

    #[test]
    fn wrong_segment_count() {
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("Bearer a b")), None);
        assert_eq!(bearer_token(Some("")), None);
    }

    #[test]
    fn surrounding_whitespace_tolerated() {
        assert_eq!(bearer_token(Some("  Bearer   token  ")), Some("token"));
    }
}
