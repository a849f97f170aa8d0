use std::sync::Arc;

use entity::user;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::crypto;
use crate::identity::Identity;
use crate::mail::{MailContext, MailKind, Mailer};
use crate::name::parse_name;
use crate::reset::ResetTokens;
use crate::store::{CreateUserError, CredentialStore, NewUser, StoreError};
use crate::token::{ActivationClaims, SessionClaims, TokenCodec, TokenError};
use crate::util::now_ts;

/// Stable, user-facing error strings. These are contract: clients and tests
/// match on them verbatim.
pub mod messages {
    pub const DUPLICATE_EMAIL: &str = "Email already registered.";
    pub const UNKNOWN_USER: &str = "Unknown user";
    pub const STALE_TOKEN: &str = "Stale token";
    pub const UNKNOWN_CREDENTIALS: &str = "Email and/or password are unknown";
    pub const INVALID_TOKEN: &str = "Invalid token";
    pub const PASSWORD_MISMATCH: &str = "Passwords don't match";
    pub const INACTIVE_USER: &str = "Inactive user";
    pub const PERMISSION_DENIED: &str = "Permission denied";
}

/// Faults that are NOT part of the mutation contract: a broken store or a
/// misconfigured codec. These surface as transport-level errors, everything
/// else is a `success: false` outcome.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("token codec failure: {0}")]
    Codec(#[from] TokenError),
}

/// Public view of a user record. Credential material never leaves the store
/// through this type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl From<&user::Model> for UserView {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            middle_name: u.middle_name.clone(),
            last_name: u.last_name.clone(),
            is_active: u.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub errors: Option<Vec<String>>,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: None,
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            success: false,
            errors: Some(vec![message.to_string()]),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterOutcome {
    pub success: bool,
    pub errors: Option<Vec<String>>,
    pub user: Option<UserView>,
}

#[derive(Debug, Serialize)]
pub struct TokenOutcome {
    pub success: bool,
    pub errors: Option<Vec<String>>,
    pub token: Option<String>,
}

impl TokenOutcome {
    fn ok(token: String) -> Self {
        Self {
            success: true,
            errors: None,
            token: Some(token),
        }
    }

    fn fail(message: &str) -> Self {
        Self {
            success: false,
            errors: Some(vec![message.to_string()]),
            token: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateOutcome {
    pub success: bool,
    pub errors: Option<Vec<String>>,
    pub user: Option<UserView>,
}

/// Allow-listed profile fields for `update`. Anything not named here is not
/// writable through the API.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Orchestrates register → activate → login → refresh → reset over the
/// credential store and token codec. All expected failures come back as
/// outcomes; `Err` means the store or codec itself broke.
pub struct AccountService {
    codec: TokenCodec,
    reset: ResetTokens,
    session_ttl_secs: i64,
    activation_ttl_secs: i64,
    password_iterations: u32,
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn Mailer>,
}

impl AccountService {
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            codec: TokenCodec::new(&config.signing_secret),
            reset: ResetTokens::new(&config.reset_secret, config.reset_window_secs),
            session_ttl_secs: config.session_ttl_secs,
            activation_ttl_secs: config.activation_ttl_secs,
            password_iterations: config.password_iterations,
            store,
            mailer,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Best-effort dispatch: failures are logged, never propagated. The state
    /// mutation that triggered the mail stands regardless.
    async fn dispatch(&self, kind: MailKind, user: &user::Model, token: Option<String>) {
        let ctx = MailContext {
            first_name: user.first_name.clone(),
            token,
        };
        if let Err(e) = self.mailer.send(kind, &user.email, &ctx).await {
            tracing::warn!(error = %e, kind = ?kind, email = %user.email, "notification dispatch failed");
        }
    }

    fn credentials_match(&self, user: &user::Model, password: &str) -> bool {
        let (Some(hash), Some(salt)) = (&user.password_hash, &user.salt) else {
            return false;
        };
        crypto::verify_password(
            password.as_bytes(),
            salt,
            hash,
            user.password_iterations as u32,
        )
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<RegisterOutcome, ServiceError> {
        let parsed = parse_name(name);
        let salt = crate::util::random_bytes(crypto::SALT_LEN);
        let password_hash = crypto::hash_password(password.as_bytes(), &salt, self.password_iterations);

        let created = self
            .store
            .create(NewUser {
                email: email.to_string(),
                password_hash,
                salt,
                password_iterations: self.password_iterations as i32,
                first_name: parsed.first,
                middle_name: parsed.middle,
                last_name: parsed.last,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(CreateUserError::DuplicateEmail) => {
                return Ok(RegisterOutcome {
                    success: false,
                    errors: Some(vec![messages::DUPLICATE_EMAIL.to_string()]),
                    user: None,
                });
            }
            Err(CreateUserError::Store(e)) => return Err(e.into()),
        };

        let activation = self
            .codec
            .sign(&ActivationClaims::new(&user.email, self.activation_ttl_secs))?;
        self.dispatch(MailKind::Activation, &user, Some(activation)).await;

        Ok(RegisterOutcome {
            success: true,
            errors: None,
            user: Some(UserView::from(&user)),
        })
    }

    /// Activating an already-active account with a fresh token succeeds
    /// silently; activation never reverts.
    pub async fn activate(&self, activation_token: &str) -> Result<Outcome, ServiceError> {
        let claims: ActivationClaims = match self.codec.verify(activation_token) {
            Ok(claims) => claims,
            Err(_) => return Ok(Outcome::fail(messages::STALE_TOKEN)),
        };

        let Some(mut user) = self.store.find_by_email(&claims.act).await? else {
            return Ok(Outcome::fail(messages::UNKNOWN_USER));
        };

        user.is_active = true;
        user.updated_at = now_ts();
        let user = self.store.save(user).await?;

        self.dispatch(MailKind::Welcome, &user, None).await;

        Ok(Outcome::ok())
    }

    /// Credentials alone decide login; `is_active` is not consulted here.
    /// Unknown email and wrong password share one message so the API does not
    /// leak which accounts exist.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenOutcome, ServiceError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(TokenOutcome::fail(messages::UNKNOWN_CREDENTIALS));
        };

        if !self.credentials_match(&user, password) {
            return Ok(TokenOutcome::fail(messages::UNKNOWN_CREDENTIALS));
        }

        let token = self
            .codec
            .sign(&SessionClaims::new(&user.email, self.session_ttl_secs))?;
        Ok(TokenOutcome::ok(token))
    }

    /// Session tokens are self-contained; logout is the client discarding its
    /// token. The mutation exists so the API surface is uniform.
    pub fn logout(&self) -> Outcome {
        Outcome::ok()
    }

    pub async fn refresh_token(&self, token: &str) -> Result<TokenOutcome, ServiceError> {
        let claims: SessionClaims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(_) => return Ok(TokenOutcome::fail(messages::INVALID_TOKEN)),
        };

        let Some(user) = self.store.find_by_email(&claims.email).await? else {
            return Ok(TokenOutcome::fail(messages::UNKNOWN_USER));
        };

        let fresh = self
            .codec
            .sign(&SessionClaims::new(&user.email, self.session_ttl_secs))?;
        Ok(TokenOutcome::ok(fresh))
    }

    /// Always succeeds, whether or not the email names an account; only the
    /// mail dispatch reveals the difference, and only server-side.
    pub async fn password_reset(&self, email: &str) -> Result<Outcome, ServiceError> {
        if let Some(user) = self.store.find_by_email(email).await? {
            let token = self.reset.make_token(&user);
            self.dispatch(MailKind::PasswordReset, &user, Some(token)).await;
        }

        Ok(Outcome::ok())
    }

    /// Check order is contract: mismatch, unknown user, stale token, inactive
    /// user. Clients depend on deterministic error reporting.
    pub async fn password_reset_confirm(
        &self,
        email: &str,
        password: &str,
        password_repeat: &str,
        reset_token: &str,
    ) -> Result<Outcome, ServiceError> {
        if password != password_repeat {
            return Ok(Outcome::fail(messages::PASSWORD_MISMATCH));
        }

        let Some(mut user) = self.store.find_by_email(email).await? else {
            return Ok(Outcome::fail(messages::UNKNOWN_USER));
        };

        if !self.reset.check_token(&user, reset_token) {
            return Ok(Outcome::fail(messages::STALE_TOKEN));
        }

        if !user.is_active || !user.has_usable_password() {
            return Ok(Outcome::fail(messages::INACTIVE_USER));
        }

        let salt = crate::util::random_bytes(crypto::SALT_LEN);
        user.password_hash = Some(crypto::hash_password(
            password.as_bytes(),
            &salt,
            self.password_iterations,
        ));
        user.salt = Some(salt);
        user.password_iterations = self.password_iterations as i32;
        user.updated_at = now_ts();
        self.store.save(user).await?;

        Ok(Outcome::ok())
    }

    /// Users update their own record only; there is no cross-user path.
    pub async fn update(
        &self,
        identity: &Identity,
        fields: ProfileUpdate,
    ) -> Result<UpdateOutcome, ServiceError> {
        let Identity::User(user) = identity else {
            return Ok(UpdateOutcome {
                success: false,
                errors: Some(vec![messages::PERMISSION_DENIED.to_string()]),
                user: None,
            });
        };

        let mut user = user.clone();
        if let Some(first_name) = fields.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = fields.last_name {
            user.last_name = last_name;
        }
        user.updated_at = now_ts();
        let user = self.store.save(user).await?;

        Ok(UpdateOutcome {
            success: true,
            errors: None,
            user: Some(UserView::from(&user)),
        })
    }
}
