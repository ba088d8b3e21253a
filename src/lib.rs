use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderName,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services.
pub mod auth;
pub mod config;
pub mod errors;
pub mod repository;
pub mod storage;

// Request pipeline: extractors, validation and multipart handling.
pub mod extract;
pub mod uploads;
pub mod validation;

// Domain.
pub mod geo;
pub mod handlers;
pub mod models;

pub mod routes;
use routes::public;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use errors::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::register, handlers::auth::create_account,
        handlers::categories::get_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::update_category_image, handlers::categories::delete_category,
        handlers::promo_codes::get_promo_codes, handlers::promo_codes::get_promo_code,
        handlers::promo_codes::create_promo_code, handlers::promo_codes::update_promo_code,
        handlers::promo_codes::delete_promo_code,
        handlers::service_types::get_service_types, handlers::service_types::get_service_type,
        handlers::service_types::create_service_type, handlers::service_types::add_service,
        handlers::service_types::delete_service, handlers::service_types::update_service_type,
        handlers::service_types::delete_service_type,
        handlers::service_providers::register_service_provider,
        handlers::service_providers::set_profile_picture,
        handlers::service_providers::verify_phone,
        handlers::service_providers::closest_emergency_ready,
        handlers::service_providers::get_service_providers,
        handlers::service_providers::get_my_balance,
        handlers::service_providers::get_available,
        handlers::service_providers::get_service_provider,
        handlers::service_providers::get_interventions,
        handlers::service_providers::get_commands,
        handlers::service_providers::get_payments,
        handlers::service_providers::add_payment,
        handlers::service_providers::validate_service_provider,
        handlers::service_providers::set_percent_to_pay,
        handlers::service_providers::set_state,
        handlers::service_providers::set_services,
        handlers::service_providers::ban_service_provider,
        handlers::commands::create_command, handlers::commands::get_commands,
        handlers::commands::get_command, handlers::commands::update_command_status,
        handlers::commands::delete_command,
    ),
    components(
        schemas(
            auth::Role,
            models::Account, models::LoginRequest, models::RegisterAccountRequest,
            models::CreateAccountRequest, models::TokenResponse, models::AuthResponse,
            models::Category, models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::PromoCode, models::CreatePromoCodeRequest, models::UpdatePromoCodeRequest,
            models::ServiceType, models::Service, models::ServiceTypeRequest, models::ServiceRequest,
            models::ServiceProvider, models::Gender, models::SpState, models::SpStatus,
            models::Diploma, models::DiplomaType, models::Payment, models::RegisteredProvider,
            models::VerifyPhoneRequest, models::VerifyPhoneResponse, models::ClosestRequest,
            models::ClosestProvider, models::BalanceResponse, models::SetStateRequest,
            models::SetServicesRequest, models::SetPercentToPayRequest, models::AddPaymentRequest,
            models::Command, models::CommandKind, models::CommandStatus, models::Intervention,
            models::CreateCommandRequest, models::UpdateCommandStatusRequest,
        )
    ),
    tags(
        (name = "marketplace", description = "Service marketplace API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared by every request. Handlers pull the parts they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles every route under `/api`, the docs and health endpoints, and the global
/// middleware stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/api", routes::api_routes())
        .layer(body_limit)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(request_span)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Creates the first admin from `ADMIN_EMAIL`/`ADMIN_PASSWORD` when both are set and no
/// account uses that email yet. Returns whether an account was created.
pub async fn bootstrap_admin(repo: &RepositoryState, config: &AppConfig) -> Result<bool, ApiError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(false);
    };
    if repo.find_account_by_email(email).await?.is_some() {
        return Ok(false);
    }

    let password_hash = auth::hash_password(password)?;
    let account = repo
        .create_account(models::NewAccount {
            email: email.clone(),
            password_hash,
            role: auth::Role::Admin,
        })
        .await?;
    tracing::info!(account_id = %account.id, "bootstrap admin created");
    Ok(true)
}

/// The resource a request addresses: the first segment under `/api`, or `-` for the
/// docs and health endpoints.
fn resource_of(path: &str) -> &str {
    path.strip_prefix("/api/")
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("-")
}

/// Span for `TraceLayer`. Carries the request id and the addressed resource; `user_id`
/// and `roles` stay empty until the `AuthUser` extractor fills them in.
fn request_span(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "api_request",
        method = %request.method(),
        path = %request.uri().path(),
        resource = resource_of(request.uri().path()),
        request_id = %request_id,
        user_id = tracing::field::Empty,
        roles = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_name_the_addressed_resource() {
        assert_eq!(resource_of("/api/serviceProviders/me/balance"), "serviceProviders");
        assert_eq!(resource_of("/api/commands"), "commands");
        assert_eq!(resource_of("/health"), "-");
        assert_eq!(resource_of("/api/"), "-");
    }
}
