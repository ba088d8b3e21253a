use std::marker::PhantomData;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    errors::ApiError,
    models::SpStatus,
    repository::RepositoryState,
};

/// Role
///
/// The fixed set of role tags carried in access tokens and checked by route guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "role_tag", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Store,
    Client,
    #[serde(rename = "sp", alias = "service-provider")]
    #[sqlx(rename = "sp")]
    ServiceProvider,
}

impl Role {
    /// Roles granted administrative rights.
    pub const ADMINS: &'static [Role] = &[Role::Admin];
}

/// Claims
///
/// The signed payload of an access token. `roles` is authoritative for route guards;
/// `sub` is re-checked against the database on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub roles: Vec<Role>,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Signs an HS256 access token for `sub` holding `roles`.
pub fn issue_token(config: &AppConfig, sub: Uuid, roles: Vec<Role>) -> Result<String, AuthError> {
    let now = jsonwebtoken::get_current_timestamp();
    let claims = Claims {
        sub,
        roles,
        iat: now as usize,
        exp: (now + config.jwt_ttl_seconds) as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Decodes and validates (signature + expiry) an access token.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the token subject and its roles.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn has_any(&self, allowed: &[Role]) -> bool {
        self.roles.iter().any(|r| allowed.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_any(Role::ADMINS)
    }

    pub fn is_provider(&self) -> bool {
        self.roles.contains(&Role::ServiceProvider)
    }

    /// A service provider may only address its own record; admins may address any.
    pub fn ensure_self_or_admin(&self, id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.id == id {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// AuthUser Extractor
///
/// 1. Reads `Authorization: Bearer <token>`.
/// 2. Decodes the JWT with the configured secret; expiry is enforced.
/// 3. Confirms the subject still exists: providers in `service_providers` (banned ones
///    are refused), everyone else in `accounts`.
///
/// Rejects with 401 on any failure, 403 for banned providers.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = decode_token(&config, token).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            ApiError::Unauthorized
        })?;

        if claims.roles.contains(&Role::ServiceProvider) {
            let provider = repo
                .get_service_provider(claims.sub)
                .await?
                .ok_or(ApiError::Unauthorized)?;
            if provider.status == SpStatus::Banned {
                return Err(ApiError::ForbiddenWith("This account has been banned.".to_string()));
            }
        } else {
            let account = repo
                .get_account(claims.sub)
                .await?
                .ok_or(ApiError::Unauthorized)?;
            // The stored role wins over a stale token.
            if !claims.roles.contains(&account.role) {
                return Err(ApiError::Unauthorized);
            }
        }

        let span = tracing::Span::current();
        span.record("user_id", tracing::field::display(claims.sub));
        span.record("roles", tracing::field::debug(&claims.roles));

        Ok(AuthUser {
            id: claims.sub,
            roles: claims.roles,
        })
    }
}

// --- Role guards ---

/// A set of roles allowed through a route guard.
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

#[derive(Debug, Clone, Copy)]
pub struct Admins;
#[derive(Debug, Clone, Copy)]
pub struct Stores;
#[derive(Debug, Clone, Copy)]
pub struct Clients;
#[derive(Debug, Clone, Copy)]
pub struct ServiceProviders;
#[derive(Debug, Clone, Copy)]
pub struct AdminsOrProviders;
#[derive(Debug, Clone, Copy)]
pub struct CommandParties;

impl RoleSet for Admins {
    const ROLES: &'static [Role] = Role::ADMINS;
}
impl RoleSet for Stores {
    const ROLES: &'static [Role] = &[Role::Store];
}
impl RoleSet for Clients {
    const ROLES: &'static [Role] = &[Role::Client];
}
impl RoleSet for ServiceProviders {
    const ROLES: &'static [Role] = &[Role::ServiceProvider];
}
impl RoleSet for AdminsOrProviders {
    const ROLES: &'static [Role] = &[Role::Admin, Role::ServiceProvider];
}
impl RoleSet for CommandParties {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Client, Role::ServiceProvider];
}

/// Authorized
///
/// An `AuthUser` that holds at least one role of `R`. Placed first in a handler's argument
/// list so that authentication (401) and the role check (403) run before path and body
/// extraction.
#[derive(Debug, Clone)]
pub struct Authorized<R: RoleSet> {
    pub user: AuthUser,
    _roles: PhantomData<R>,
}

impl<R: RoleSet> Authorized<R> {
    pub fn new(user: AuthUser) -> Result<Self, ApiError> {
        if user.has_any(R::ROLES) {
            Ok(Self {
                user,
                _roles: PhantomData,
            })
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

impl<S, R> FromRequestParts<S> for Authorized<R>
where
    S: Send + Sync,
    R: RoleSet,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Self::new(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_roles() {
        let config = AppConfig::default();
        let id = Uuid::new_v4();
        let token = issue_token(&config, id, vec![Role::ServiceProvider]).unwrap();
        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.roles, vec![Role::ServiceProvider]);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let config = AppConfig::default();
        let other = AppConfig {
            jwt_secret: "another-secret".to_string(),
            ..AppConfig::default()
        };
        let token = issue_token(&other, Uuid::new_v4(), vec![Role::Admin]).unwrap();
        assert!(decode_token(&config, &token).is_err());
    }

    #[test]
    fn provider_role_serializes_as_sp() {
        assert_eq!(serde_json::to_string(&Role::ServiceProvider).unwrap(), "\"sp\"");
        let role: Role = serde_json::from_str("\"service-provider\"").unwrap();
        assert_eq!(role, Role::ServiceProvider);
    }

    #[test]
    fn passwords_verify_against_their_hash_only() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn role_guard_rejects_missing_roles() {
        let client = AuthUser {
            id: Uuid::new_v4(),
            roles: vec![Role::Client],
        };
        assert!(Authorized::<Clients>::new(client.clone()).is_ok());
        assert!(matches!(
            Authorized::<Admins>::new(client),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn providers_may_only_address_themselves() {
        let sp = AuthUser {
            id: Uuid::new_v4(),
            roles: vec![Role::ServiceProvider],
        };
        assert!(sp.ensure_self_or_admin(sp.id).is_ok());
        assert!(sp.ensure_self_or_admin(Uuid::new_v4()).is_err());

        let admin = AuthUser {
            id: Uuid::new_v4(),
            roles: vec![Role::Admin],
        };
        assert!(admin.ensure_self_or_admin(sp.id).is_ok());
    }
}
