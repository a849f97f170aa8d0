use entity::user;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::util::{hex_encode, now_ts};

/// Derived-secret password-reset tokens.
///
/// A token is `{bucket_hex}-{mac_hex}` where the MAC covers the user id, the
/// user's *current* password hash, and the time bucket (`now / window`),
/// keyed with the reset secret. Nothing is stored: validity is recomputed
/// from current user state at check time, so changing the password silently
/// invalidates every token issued before the change.
///
/// `check_token` accepts the current bucket and the one immediately before
/// it, bounding both token lifetime and clock skew.
#[derive(Clone)]
pub struct ResetTokens {
    secret: Vec<u8>,
    window_secs: i64,
}

impl ResetTokens {
    pub fn new(secret: &[u8], window_secs: i64) -> Self {
        assert!(window_secs > 0, "reset window must be positive");
        Self {
            secret: secret.to_vec(),
            window_secs,
        }
    }

    fn current_bucket(&self) -> i64 {
        now_ts() / self.window_secs
    }

    fn mac_hex(&self, user: &user::Model, bucket: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(user.id.as_bytes());
        mac.update(&[0]);
        if let Some(hash) = &user.password_hash {
            mac.update(hash);
        }
        mac.update(&[0]);
        mac.update(&bucket.to_be_bytes());
        hex_encode(&mac.finalize().into_bytes())
    }

    fn token_for_bucket(&self, user: &user::Model, bucket: i64) -> String {
        format!("{:x}-{}", bucket, self.mac_hex(user, bucket))
    }

    pub fn make_token(&self, user: &user::Model) -> String {
        self.token_for_bucket(user, self.current_bucket())
    }

    pub fn check_token(&self, user: &user::Model, token: &str) -> bool {
        let Some((bucket_hex, mac_hex)) = token.split_once('-') else {
            return false;
        };
        let Ok(bucket) = i64::from_str_radix(bucket_hex, 16) else {
            return false;
        };

        let current = self.current_bucket();
        if bucket != current && bucket != current - 1 {
            return false;
        }

        let expected = self.mac_hex(user, bucket);
        if expected.len() != mac_hex.len() {
            return false;
        }
        subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), mac_hex.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::uuid_v4;

    fn reset() -> ResetTokens {
        ResetTokens::new(b"test-reset-secret", 3600)
    }

    fn test_user() -> user::Model {
        user::Model {
            id: uuid_v4(),
            email: "user@example.com".to_string(),
            password_hash: Some(vec![7u8; 32]),
            salt: Some(vec![9u8; 16]),
            password_iterations: 1_000,
            is_active: true,
            first_name: "John".to_string(),
            middle_name: String::new(),
            last_name: "Doe".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn token_roundtrip() {
        let user = test_user();
        let token = reset().make_token(&user);
        assert!(reset().check_token(&user, &token));
    }

    #[test]
    fn previous_bucket_accepted() {
        let r = reset();
        let user = test_user();
        let token = r.token_for_bucket(&user, r.current_bucket() - 1);
        assert!(r.check_token(&user, &token));
    }

    #[test]
    fn older_buckets_rejected() {
        let r = reset();
        let user = test_user();
        let token = r.token_for_bucket(&user, r.current_bucket() - 2);
        assert!(!r.check_token(&user, &token));
    }

    #[test]
    fn future_bucket_rejected() {
        let r = reset();
        let user = test_user();
        let token = r.token_for_bucket(&user, r.current_bucket() + 1);
        assert!(!r.check_token(&user, &token));
    }

    #[test]
    fn password_change_invalidates_token() {
        let r = reset();
        let mut user = test_user();
        let token = r.make_token(&user);

        user.password_hash = Some(vec![8u8; 32]);
        assert!(!r.check_token(&user, &token));

        let fresh = r.make_token(&user);
        assert!(r.check_token(&user, &fresh));
    }

    #[test]
    fn token_bound_to_user() {
        let r = reset();
        let user = test_user();
        let mut other = test_user();
        other.id = uuid_v4();

        let token = r.make_token(&user);
        assert!(!r.check_token(&other, &token));
    }

    #[test]
    fn malformed_tokens_rejected() {
        let r = reset();
        let user = test_user();
        assert!(!r.check_token(&user, ""));
        assert!(!r.check_token(&user, "12345"));
        assert!(!r.check_token(&user, "zz-zz"));
        assert!(!r.check_token(&user, "-deadbeef"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let user = test_user();
        let token = ResetTokens::new(b"secret-a", 3600).make_token(&user);
        assert!(!ResetTokens::new(b"secret-b", 3600).check_token(&user, &token));
    }
}
