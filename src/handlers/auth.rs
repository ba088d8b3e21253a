use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{self, Admins, Authorized, Role},
    errors::ApiError,
    extract::ValidatedJson,
    models::{
        Account, AuthResponse, CreateAccountRequest, LoginRequest, NewAccount,
        RegisterAccountRequest, TokenResponse,
    },
};

/// login
///
/// [Public Route] Exchanges an email and password for an access token. Unknown emails and
/// wrong passwords get the same `401`.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let account = state
        .repo
        .find_account_by_email(&payload.email)
        .await?
        .filter(|account| auth::verify_password(&payload.password, &account.password_hash))
        .ok_or(ApiError::InvalidCredentials)?;

    let token = auth::issue_token(&state.config, account.id, vec![account.role])?;
    tracing::info!(account_id = %account.id, "account signed in");
    Ok(Json(TokenResponse { token }))
}

/// register
///
/// [Public Route] Self-service sign-up. Always creates a `client` account and signs it in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterAccountRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let account = create(&state, payload.email, &payload.password, Role::Client).await?;
    let token = auth::issue_token(&state.config, account.id, vec![account.role])?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, account })))
}

/// create_account
///
/// [Admin Route] Provisions an admin, store or client account.
#[utoipa::path(
    post,
    path = "/api/auth/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_account(
    _admin: Authorized<Admins>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = create(&state, payload.email, &payload.password, payload.role).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn create(
    state: &AppState,
    email: String,
    password: &str,
    role: Role,
) -> Result<Account, ApiError> {
    let password_hash = auth::hash_password(password)?;
    let account = state
        .repo
        .create_account(NewAccount {
            email,
            password_hash,
            role,
        })
        .await?;
    tracing::info!(account_id = %account.id, role = ?account.role, "account created");
    Ok(account)
}
