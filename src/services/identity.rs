//! Identity service: registration, login, role checks, password reset.
//!
//! This realizes the identity/role collaborator contract in-process: the
//! lifecycle operations call [`require_role`] / [`get_active_user`] to
//! enforce their role and ownership gates.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Duration;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{User, UserRole};
use crate::store::{NewPasswordResetToken, NewUser, StoreTx};
use crate::utils::error::{AppError, AppResult};

use super::TicketingService;

const RESET_TOKEN_VALIDITY_MINUTES: i64 = 30;

pub(crate) async fn get_active_user(tx: &mut dyn StoreTx, user_id: Uuid) -> AppResult<User> {
    tx.user_by_id(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub(crate) async fn require_role(
    tx: &mut dyn StoreTx,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<User> {
    let user = get_active_user(tx, user_id).await?;
    if user.role != role {
        return Err(AppError::Forbidden(format!(
            "User {user_id} must have role {role}"
        )));
    }
    Ok(user)
}

pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    if password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn hash_reset_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.trim().as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetOutcome {
    pub sent: bool,
    pub mode: String,
    pub message: String,
    /// Only surfaced in simulation mode, so local setups can complete the
    /// flow without a mailbox.
    pub reset_token: Option<String>,
}

impl TicketingService {
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> AppResult<User> {
        if !role.self_registration_allowed() {
            return Err(AppError::Validation(
                "Only customer, event organizer, or platform admin registration is allowed".into(),
            ));
        }
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".into()));
        }
        let password_hash = hash_password(password)?;

        let mut tx = self.begin().await?;
        if tx.user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".into()));
        }
        let user = tx
            .insert_user(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash,
                role,
                is_active: true,
            })
            .await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        let mut tx = self.begin().await?;
        let user = tx
            .user_by_email(&email)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Auth("Invalid credentials".into()))?;
        if !verify_password(password, &user.password_hash) {
            return Err(AppError::Auth("Invalid credentials".into()));
        }
        Ok(user)
    }

    pub async fn list_users(&self, role: Option<UserRole>) -> AppResult<Vec<User>> {
        let mut tx = self.begin().await?;
        tx.list_users(role).await
    }

    /// Always answers with the same generic message so the endpoint cannot
    /// be used to probe which accounts exist.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<PasswordResetOutcome> {
        let generic_msg = "If the account exists, password reset instructions were sent.";
        let email = normalize_email(email);

        let mut tx = self.begin().await?;
        let Some(user) = tx.user_by_email(&email).await?.filter(|u| u.is_active) else {
            return Ok(PasswordResetOutcome {
                sent: true,
                mode: "simulation".into(),
                message: generic_msg.into(),
                reset_token: None,
            });
        };

        // A new request supersedes any outstanding token.
        tx.revoke_reset_tokens(user.id, None).await?;

        let now = self.now();
        let raw_token = self.refs.reset_token();
        tx.insert_reset_token(NewPasswordResetToken {
            user_id: user.id,
            token_hash: hash_reset_token(&raw_token),
            expires_at: now + Duration::minutes(RESET_TOKEN_VALIDITY_MINUTES),
            created_at: now,
        })
        .await?;
        tx.commit().await?;

        let subject = format!("{} password reset", self.app_name);
        let body = format!(
            "Hi {},\n\n\
             We received a password reset request for your account.\n\
             Reset token (valid for {} minutes): {}\n\n\
             If you did not request this, you can ignore this email.",
            user.name, RESET_TOKEN_VALIDITY_MINUTES, raw_token
        );
        let receipt = self.notifier.notify(&user.email, &subject, &body).await?;

        Ok(PasswordResetOutcome {
            sent: true,
            mode: receipt.mode.clone(),
            message: generic_msg.into(),
            reset_token: (receipt.mode == "simulation").then_some(raw_token),
        })
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let token_hash = hash_reset_token(token);

        let mut tx = self.begin().await?;
        let token_row = tx
            .reset_token_by_hash(&token_hash)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or already used token".into()))?;

        if token_row.expires_at < self.now() {
            // Consume the expired token so it cannot be retried.
            tx.mark_reset_token_used(token_row.id).await?;
            tx.commit().await?;
            return Err(AppError::Validation("Reset token has expired".into()));
        }

        let user = tx
            .user_by_id(token_row.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Validation("Account is not active".into()))?;

        let password_hash = hash_password(new_password)?;
        tx.set_user_password(user.id, &password_hash).await?;
        tx.mark_reset_token_used(token_row.id).await?;
        tx.revoke_reset_tokens(user.id, Some(token_row.id)).await?;
        tx.commit().await?;
        Ok(())
    }
}
