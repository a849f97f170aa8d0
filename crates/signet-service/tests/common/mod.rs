use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use entity::user;

use signet_service::accounts::AccountService;
use signet_service::config::Config;
use signet_service::identity::IdentityResolver;
use signet_service::mail::{MailContext, MailError, MailKind, Mailer};
use signet_service::reset::ResetTokens;
use signet_service::store::{CreateUserError, CredentialStore, NewUser, StoreError};
use signet_service::token::TokenCodec;
use signet_service::util::{now_ts, uuid_v4};

pub const SIGNING_SECRET: &[u8] = b"integration-signing-secret";
pub const RESET_SECRET: &[u8] = b"integration-reset-secret";

/// In-memory credential store with the same uniqueness contract as the
/// database-backed one.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<user::Model>>,
}

impl MemoryStore {
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn get(&self, email: &str) -> Option<user::Model> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn remove(&self, email: &str) {
        self.users.lock().unwrap().retain(|u| u.email != email);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, StoreError> {
        Ok(self.get(email))
    }

    async fn create(&self, new_user: NewUser) -> Result<user::Model, CreateUserError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(CreateUserError::DuplicateEmail);
        }

        let now = now_ts();
        let created = user::Model {
            id: uuid_v4(),
            email: new_user.email,
            password_hash: Some(new_user.password_hash),
            salt: Some(new_user.salt),
            password_iterations: new_user.password_iterations,
            is_active: false,
            first_name: new_user.first_name,
            middle_name: new_user.middle_name,
            last_name: new_user.last_name,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn save(&self, user: user::Model) -> Result<user::Model, StoreError> {
        let mut users = self.users.lock().unwrap();
        let Some(slot) = users.iter_mut().find(|u| u.id == user.id) else {
            return Err(StoreError::Database(format!("no user with id {}", user.id)));
        };
        *slot = user.clone();
        Ok(user)
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub kind: MailKind,
    pub to: String,
    pub first_name: String,
    pub token: Option<String>,
}

/// Records every send; flip `fail` to make delivery start erroring.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, kind: MailKind, to: &str, ctx: &MailContext) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Delivery("recording mailer set to fail".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            kind,
            to: to.to_string(),
            first_name: ctx.first_name.clone(),
            token: ctx.token.clone(),
        });
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        signing_secret: SIGNING_SECRET.to_vec(),
        reset_secret: RESET_SECRET.to_vec(),
        session_ttl_secs: 30 * 60,
        activation_ttl_secs: 12 * 60,
        reset_window_secs: 60 * 60,
        password_iterations: 1_000,
        mail: None,
    }
}

pub struct Harness {
    pub service: AccountService,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub resolver: IdentityResolver,
    pub config: Config,
}

impl Harness {
    pub fn codec(&self) -> TokenCodec {
        TokenCodec::new(&self.config.signing_secret)
    }

    pub fn reset_tokens(&self) -> ResetTokens {
        ResetTokens::new(&self.config.reset_secret, self.config.reset_window_secs)
    }
}

pub fn harness() -> Harness {
    let config = test_config();
    let store = Arc::new(MemoryStore::default());
    let mailer = Arc::new(RecordingMailer::default());

    let service = AccountService::new(&config, store.clone(), mailer.clone());
    let resolver = IdentityResolver::new(
        TokenCodec::new(&config.signing_secret),
        store.clone(),
    );

    Harness {
        service,
        store,
        mailer,
        resolver,
        config,
    }
}
