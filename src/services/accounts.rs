use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::entities::{order, user};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Username must be between 1 and 150 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Account summary for the profile endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub orders_count: u64,
}

/// Minimal role payload for frontend gating.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleView {
    pub username: String,
    pub is_staff: bool,
}

/// User registration, credential checks, and account views.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbPool>,
    auth: AuthService,
}

impl AccountService {
    pub fn new(db: Arc<DbPool>, auth: AuthService) -> Self {
        Self { db, auth }
    }

    /// Registers a new user with an argon2-hashed password. Usernames
    /// are unique; the password hash never leaves the service.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<user::Model, ServiceError> {
        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(input.username.as_str()))
            .one(&*self.db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(
                "A user with that username already exists".to_string(),
            ));
        }

        let password_hash = self.auth.hash_password(&input.password)?;

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(password_hash),
            is_staff: Set(false),
            date_joined: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!("Registered user {}", created.id);
        Ok(created)
    }

    /// Verifies a username/password pair. The same error covers an
    /// unknown username and a wrong password.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn verify_credentials(&self, input: &LoginInput) -> Result<user::Model, ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(input.username.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        if !self.auth.verify_password(&input.password, &user.password_hash) {
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<ProfileView, ServiceError> {
        let user = self.require_user(user_id).await?;
        let orders_count = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await?;

        Ok(ProfileView {
            username: user.username,
            email: user.email,
            is_staff: user.is_staff,
            date_joined: user.date_joined,
            orders_count,
        })
    }

    #[instrument(skip(self))]
    pub async fn user_role(&self, user_id: Uuid) -> Result<RoleView, ServiceError> {
        let user = self.require_user(user_id).await?;
        Ok(RoleView {
            username: user.username,
            is_staff: user.is_staff,
        })
    }

    async fn require_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))
    }
}
