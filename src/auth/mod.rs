use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{refresh_token, user};
use crate::errors::{ErrorResponse, ServiceError};

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
/// A refresh token is never accepted on authenticated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    /// Token id; for refresh tokens this keys the persisted row.
    pub jti: String,
    pub kind: TokenKind,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
    /// Not valid before (seconds since epoch)
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Access/refresh token pair returned by login and refresh.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Authenticated caller, extracted from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token is revoked or unknown")]
    RevokedToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Failed to create token")]
    TokenCreation,

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::RevokedToken
            | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserNotFound => StatusCode::UNAUTHORIZED,
            Self::TokenCreation | Self::DatabaseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn response_message(&self) -> String {
        match self {
            Self::TokenCreation | Self::DatabaseError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(err)).into_response()
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(e) => ServiceError::DatabaseError(e),
            AuthError::TokenCreation | AuthError::InternalError(_) => {
                ServiceError::InternalError(err.to_string())
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Token issuance parameters, sourced from [`crate::config::AppConfig`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: "storefront-api".to_string(),
            audience: "storefront-clients".to_string(),
            access_token_ttl: Duration::minutes(30),
            refresh_token_ttl: Duration::days(7),
        }
    }
}

/// Issues, validates, and rotates JWTs, and hashes user passwords.
/// Refresh tokens are persisted by `jti` and are single use: a successful
/// refresh revokes the presented token and stores its replacement.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::HashError(e.to_string()))
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                warn!("Stored password hash failed to parse: {}", e);
                false
            }
        }
    }

    /// Issues a fresh access/refresh pair and persists the refresh token.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn issue_tokens(&self, user: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();

        let access = self.encode_claims(&self.build_claims(user, TokenKind::Access))?;

        let refresh_claims = self.build_claims(user, TokenKind::Refresh);
        let refresh_jti: Uuid = refresh_claims
            .jti
            .parse()
            .map_err(|_| AuthError::InternalError("malformed token id".to_string()))?;
        let refresh_exp = refresh_claims.exp;
        let refresh = self.encode_claims(&refresh_claims)?;

        refresh_token::ActiveModel {
            id: Set(refresh_jti),
            user_id: Set(user.id),
            expires_at: Set(
                chrono::DateTime::from_timestamp(refresh_exp, 0).unwrap_or(now)
            ),
            revoked: Set(false),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        Ok(TokenPair { access, refresh })
    }

    /// Validates signature, expiry, issuer, and audience.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Validates an access token and resolves the calling user.
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }
        let id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            id,
            username: claims.username,
            email: claims.email,
            is_staff: claims.is_staff,
        })
    }

    /// Exchanges a refresh token for a new pair, revoking the old token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }
        let jti: Uuid = claims.jti.parse().map_err(|_| AuthError::InvalidToken)?;

        let stored = refresh_token::Entity::find_by_id(jti)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::RevokedToken)?;
        if stored.revoked || stored.expires_at <= Utc::now() {
            return Err(AuthError::RevokedToken);
        }

        let user = user::Entity::find_by_id(stored.user_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let mut revoke: refresh_token::ActiveModel = stored.into();
        revoke.revoked = Set(true);
        revoke.update(&*self.db).await?;

        self.issue_tokens(&user).await
    }

    fn build_claims(&self, user: &user::Model, kind: TokenKind) -> Claims {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.config.access_token_ttl,
            TokenKind::Refresh => self.config.refresh_token_ttl,
        };
        Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            is_staff: user.is_staff,
            jti: Uuid::new_v4().to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        }
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|_| AuthError::TokenCreation)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    crate::AppState: axum::extract::FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = crate::AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)?;

        state.services.auth.authenticate(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DatabaseConnection;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig::new("test-secret-at-least-32-bytes-long!"),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn test_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            is_staff: false,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let svc = service();
        let hash = svc.hash_password("s3cret-password").unwrap();
        assert_ne!(hash, "s3cret-password");
        assert!(svc.verify_password("s3cret-password", &hash));
        assert!(!svc.verify_password("wrong-password", &hash));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        let svc = service();
        assert!(!svc.verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn access_token_validates_and_carries_identity() {
        let svc = service();
        let user = test_user();
        let token = svc
            .encode_claims(&svc.build_claims(&user, TokenKind::Access))
            .unwrap();

        let auth_user = svc.authenticate(&token).unwrap();
        assert_eq!(auth_user.id, user.id);
        assert_eq!(auth_user.username, "alice");
        assert!(!auth_user.is_staff);
    }

    #[test]
    fn refresh_token_rejected_on_authenticated_paths() {
        let svc = service();
        let token = svc
            .encode_claims(&svc.build_claims(&test_user(), TokenKind::Refresh))
            .unwrap();

        assert!(matches!(
            svc.authenticate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let svc = service();
        let other = AuthService::new(
            AuthConfig::new("a-completely-different-secret-key!!"),
            Arc::new(DatabaseConnection::Disconnected),
        );
        let token = other
            .encode_claims(&other.build_claims(&test_user(), TokenKind::Access))
            .unwrap();

        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_maps_to_token_expired() {
        let svc = service();
        let user = test_user();
        let mut claims = svc.build_claims(&user, TokenKind::Access);
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = claims.iat + 60;
        let token = svc.encode_claims(&claims).unwrap();

        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }
}
