//! Registration and credential checks

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    error::{AppError, AppResult, Context},
    models::{NewUser, Role, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
}

impl AuthService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a `user` account. Names are unique.
    pub async fn register(&self, username: &str, password: &str) -> AppResult<User> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput(
                "Username and password are required".to_string(),
            ));
        }

        if self
            .repository
            .store()
            .user_by_name(username)
            .await
            .context("failed to check username existence")?
            .is_some()
        {
            return Err(AppError::UserExists);
        }

        // Hash outside the unit so no row stays locked during the slow part
        let password_hash = hash_password(password.to_string()).await?;

        let new_user = NewUser {
            name: username.to_string(),
            password_hash,
            role: Role::User,
        };

        let user = self
            .repository
            .atomically(move |tx| {
                Box::pin(async move {
                    if tx
                        .user_by_name(&new_user.name)
                        .await
                        .context("failed to check username existence")?
                        .is_some()
                    {
                        return Err(AppError::UserExists);
                    }
                    tx.insert_user(&new_user).await.context("failed to create user")
                })
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.name, "User registered");
        Ok(user)
    }

    /// Check credentials and return the account
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .repository
            .store()
            .user_by_name(username)
            .await
            .context("failed to get user by username")?
            .ok_or(AppError::UserNotFound)?;

        if !verify_password(user.password.clone(), password.to_string()).await? {
            tracing::debug!(username, "Rejected login with wrong password");
            return Err(AppError::InvalidPassword);
        }

        Ok(user)
    }
}

/// Hash a password using Argon2 with a random salt
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Verify a password against a stored PHC hash (constant-time comparison)
pub async fn verify_password(hash: String, password: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
}
