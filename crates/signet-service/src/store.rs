use std::time::Duration;

use async_trait::async_trait;
use entity::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set, SqlErr, Unchanged,
};
use thiserror::Error;

use crate::util::{now_ts, uuid_v4};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fields for a freshly registered (inactive) account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Vec<u8>,
    pub salt: Vec<u8>,
    pub password_iterations: i32,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

/// Repository interface over user records. Email uniqueness is the store's
/// constraint; concurrent registrations with the same email get exactly one
/// winner without application-level locking.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, StoreError>;

    async fn create(&self, new_user: NewUser) -> Result<user::Model, CreateUserError>;

    /// Persist a mutated user row. The caller owns `updated_at`.
    async fn save(&self, user: user::Model) -> Result<user::Model, StoreError>;
}

fn map_db_err(e: sea_orm::DbErr) -> StoreError {
    StoreError::Database(e.to_string())
}

pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(database_url);
        options.max_connections(5);
        options.min_connections(1);
        options.connect_timeout(Duration::from_secs(5));
        options.acquire_timeout(Duration::from_secs(5));
        options.sqlx_logging(false);

        let db = Database::connect(options).await.map_err(map_db_err)?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl CredentialStore for SeaOrmStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, StoreError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn create(&self, new_user: NewUser) -> Result<user::Model, CreateUserError> {
        let now = now_ts();
        let active = user::ActiveModel {
            id: Set(uuid_v4()),
            email: Set(new_user.email),
            password_hash: Set(Some(new_user.password_hash)),
            salt: Set(Some(new_user.salt)),
            password_iterations: Set(new_user.password_iterations),
            is_active: Set(false),
            first_name: Set(new_user.first_name),
            middle_name: Set(new_user.middle_name),
            last_name: Set(new_user.last_name),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match active.insert(&self.db).await {
            Ok(created) => Ok(created),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(CreateUserError::DuplicateEmail),
                _ => Err(map_db_err(e).into()),
            },
        }
    }

    async fn save(&self, user: user::Model) -> Result<user::Model, StoreError> {
        let active = user::ActiveModel {
            id: Unchanged(user.id),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            salt: Set(user.salt),
            password_iterations: Set(user.password_iterations),
            is_active: Set(user.is_active),
            first_name: Set(user.first_name),
            middle_name: Set(user.middle_name),
            last_name: Set(user.last_name),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        };

        active.update(&self.db).await.map_err(map_db_err)
    }
}
