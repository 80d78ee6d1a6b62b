//! Login and registration

use crate::security::{verify_password_blocking, JwtManager};
use crate::uow::{TransactionMode, UnitOfWork};
use songs_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    jwt: JwtManager,
}

impl AuthService {
    pub fn new(pool: SqlitePool, jwt: JwtManager) -> Self {
        Self { pool, jwt }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(TransactionMode::NonTransactional).await;
        let result = uow.users().get_by_username(username).await;
        let user = uow.exit(result).await?;

        let Some(user) = user else {
            warn!(username = %username, "Login for unknown user");
            return Err(Error::InvalidCredentials);
        };

        if !verify_password_blocking(password, &user.password_hash, &user.password_salt).await? {
            warn!(username = %username, "Login with wrong password");
            return Err(Error::InvalidCredentials);
        }

        self.jwt.issue(&user.username)
    }

    /// Create an account; `Conflict` when the username is taken
    pub async fn register(&self, username: &str, password: &str) -> Result<String> {
        let mut uow = UnitOfWork::new(self.pool.clone());
        uow.enter(TransactionMode::NonTransactional).await;

        let result = async {
            if uow.users().get_by_username(username).await?.is_some() {
                return Err(Error::Conflict("Username already exists".to_string()));
            }
            uow.users().create(username, password).await
        }
        .await;

        let user = uow.exit(result).await?;
        info!(username = %user.username, "User registered");
        Ok(user.username)
    }
}
