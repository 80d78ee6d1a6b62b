//! User accounts

use crate::security::hash_password_blocking;
use crate::uow::TxContext;
use songs_common::db::User;
use songs_common::{Error, Result};
use uuid::Uuid;

#[derive(Clone)]
pub struct UsersRepository {
    ctx: TxContext,
}

impl UsersRepository {
    pub fn new(ctx: TxContext) -> Self {
        Self { ctx }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut conn = self.ctx.conn().await?;
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, password_salt FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    /// Create a user, hashing the password before it is stored
    ///
    /// Returns `Conflict` when the username is taken.
    pub async fn create(&self, username: &str, password: &str) -> Result<User> {
        let stored = hash_password_blocking(password).await?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: stored.hash,
            password_salt: stored.salt,
        };

        let mut conn = self.ctx.conn().await?;
        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, password_salt) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) => {
                let err = Error::from(e);
                if err.is_unique_violation() {
                    Err(Error::Conflict("Username already exists".to_string()))
                } else {
                    Err(err)
                }
            }
        }
    }
}
