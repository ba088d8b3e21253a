use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Role,
    errors::ApiError,
    validation::{self, Validate},
};

/// Account
///
/// Operator and customer identities (admins, stores, clients) stored in `accounts`.
/// Service providers authenticate with their own record and never have an account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `accounts`; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::email("email", &self.email)?;
        validation::length("password", &self.password, 1, 255)
    }
}

/// Public sign-up payload. Always creates a `client` account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterAccountRequest {
    pub email: String,
    pub password: String,
}

impl Validate for RegisterAccountRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::email("email", &self.email)?;
        validation::length("password", &self.password, 8, 255)
    }
}

/// Admin-only payload for provisioning admin, store or client accounts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Validate for CreateAccountRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::email("email", &self.email)?;
        validation::length("password", &self.password, 8, 255)?;
        if self.role == Role::ServiceProvider {
            return Err(ApiError::Validation(
                "\"role\" must be one of [admin, store, client]".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub account: Account,
}
