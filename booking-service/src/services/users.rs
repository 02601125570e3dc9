use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::{hash_password, verify_password, TokenIssuer};
use crate::error::{AppError, AppResult};
use crate::mailer::{Email, Mailer};
use crate::models::{NewUser, Role, User};
use crate::repository::UserRepository;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenIssuer>,
    mailer: Arc<dyn Mailer>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<dyn TokenIssuer>, mailer: Arc<dyn Mailer>) -> Self {
        Self { users, tokens, mailer }
    }

    pub async fn register(&self, input: RegisterInput) -> AppResult<User> {
        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();

        if name.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if !valid_email(&email) {
            return Err(AppError::validation("invalid email address"));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation("password must be at least 8 characters"));
        }
        let role = match input.role.as_deref().map(str::trim) {
            None | Some("") => Role::User,
            Some(role) => role
                .to_lowercase()
                .parse::<Role>()
                .map_err(|_| AppError::validation("role must be user or owner"))?,
        };

        let new_user = NewUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash: hash_password(&input.password)?,
            phone: input.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            role: role.as_str().to_string(),
        };

        let user = self
            .users
            .create(new_user)
            .await?
            .ok_or_else(|| AppError::Conflict("email already registered".to_string()))?;
        info!("Registered user {} as {}", user.id, user.role);

        if let Err(e) = self.mailer.send(Email::welcome(&user)).await {
            warn!("Failed to send welcome email to user {}: {:#}", user.id, e);
        }

        Ok(user)
    }

    pub async fn login(&self, input: LoginInput) -> AppResult<Session> {
        let email = input.email.trim().to_lowercase();
        let invalid = || AppError::Unauthorized("invalid email or password".to_string());

        let user = self.users.find_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(&input.password, &user.password_hash) {
            warn!("Rejected login for user {}", user.id);
            return Err(invalid());
        }

        let role = user
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(format!("user {} has {}", user.id, e)))?;
        let token = self.tokens.issue(user.id, role)?;

        info!("User {} logged in", user.id);
        Ok(Session { token, user })
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))
    }
}
