use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account record.
///
/// `password_hash` is the server-side PBKDF2 output over the submitted
/// password with the per-user `salt` and `password_iterations`. A user with
/// no hash set cannot log in or confirm a password reset.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub email: String,

    pub password_hash: Option<Vec<u8>>,
    pub salt: Option<Vec<u8>>,
    pub password_iterations: i32,

    /// Accounts start inactive and flip to active exactly once, via the
    /// emailed activation token.
    pub is_active: bool,

    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn full_name(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        for p in [&self.first_name, &self.middle_name, &self.last_name] {
            if !p.is_empty() {
                parts.push(p.as_str());
            }
        }
        parts.join(" ")
    }

    pub fn has_usable_password(&self) -> bool {
        self.password_hash.as_ref().is_some_and(|v| !v.is_empty())
            && self.salt.as_ref().is_some_and(|v| !v.is_empty())
    }
}
