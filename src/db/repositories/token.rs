use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{auth_tokens, users};

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fetch the user's token, minting one on first use. Logins after the
    /// first always see the original key.
    pub async fn get_or_create(&self, user_id: i32) -> Result<auth_tokens::Model> {
        let existing = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query token by user")?;

        if let Some(token) = existing {
            return Ok(token);
        }

        let token = auth_tokens::ActiveModel {
            key: Set(generate_token_key()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };

        token
            .insert(&self.conn)
            .await
            .context("Failed to insert token")
    }

    /// Resolve a presented key to the user it belongs to.
    pub async fn resolve_user(&self, key: &str) -> Result<Option<users::Model>> {
        let row = auth_tokens::Entity::find_by_id(key.to_owned())
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query token by key")?;

        Ok(row.and_then(|(_, user)| user))
    }
}

/// Generate a random token key (40 character hex string)
#[must_use]
pub fn generate_token_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 20] = rng.random();

    bytes.iter().fold(String::with_capacity(40), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::generate_token_key;

    #[test]
    fn token_keys_are_40_hex_chars() {
        let key = generate_token_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn token_keys_are_unique_enough() {
        assert_ne!(generate_token_key(), generate_token_key());
    }
}
