use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, AvailabilityFilter, Category, Command, CommandScope, CommandStatus,
    CreateCategoryRequest, CreatePromoCodeRequest, Intervention, NewAccount, NewCommand,
    NewServiceProvider, Payment, PromoCode, ServiceProvider, ServiceRequest, ServiceType,
    ServiceTypeRequest, SpState, SpStatus, UpdateCategoryRequest, UpdatePromoCodeRequest,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A record referenced by the operation (not the one addressed by the route) is missing.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A uniqueness rule or a state rule was violated.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract used by handlers. Lookups of the record a route addresses
/// return `Option` so the handler can answer `404` with the resource name; failures of
/// the store itself surface as `RepositoryError`.
///
/// `Send + Sync + async_trait` make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn get_account(&self, id: Uuid) -> RepoResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>>;
    // Conflict when the email is taken.
    async fn create_account(&self, account: NewAccount) -> RepoResult<Account>;

    // --- Categories ---
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>>;
    async fn create_category(
        &self,
        req: CreateCategoryRequest,
        image: Option<String>,
    ) -> RepoResult<Category>;
    async fn update_category(
        &self,
        id: Uuid,
        req: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>>;
    async fn set_category_image(&self, id: Uuid, image: String) -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: Uuid) -> RepoResult<Option<Category>>;

    // --- Promo codes (codes are stored upper-cased) ---
    async fn list_promo_codes(&self) -> RepoResult<Vec<PromoCode>>;
    async fn get_promo_code(&self, id: Uuid) -> RepoResult<Option<PromoCode>>;
    async fn find_promo_code(&self, code: &str) -> RepoResult<Option<PromoCode>>;
    async fn create_promo_code(&self, req: CreatePromoCodeRequest) -> RepoResult<PromoCode>;
    async fn update_promo_code(
        &self,
        id: Uuid,
        req: UpdatePromoCodeRequest,
    ) -> RepoResult<Option<PromoCode>>;
    async fn delete_promo_code(&self, id: Uuid) -> RepoResult<Option<PromoCode>>;

    // --- Service types ---
    async fn list_service_types(&self) -> RepoResult<Vec<ServiceType>>;
    async fn get_service_type(&self, id: Uuid) -> RepoResult<Option<ServiceType>>;
    async fn create_service_type(&self, req: ServiceTypeRequest) -> RepoResult<ServiceType>;
    async fn update_service_type(
        &self,
        id: Uuid,
        req: ServiceTypeRequest,
    ) -> RepoResult<Option<ServiceType>>;
    async fn delete_service_type(&self, id: Uuid) -> RepoResult<Option<ServiceType>>;
    async fn add_service(
        &self,
        type_id: Uuid,
        req: ServiceRequest,
    ) -> RepoResult<Option<ServiceType>>;
    // `None` when the type is missing, `NotFound("service")` when only the service is.
    async fn remove_service(
        &self,
        type_id: Uuid,
        service_id: Uuid,
    ) -> RepoResult<Option<ServiceType>>;

    // --- Service providers ---
    async fn list_service_providers(
        &self,
        status: Option<SpStatus>,
    ) -> RepoResult<Vec<ServiceProvider>>;
    async fn list_available_providers(
        &self,
        filter: &AvailabilityFilter,
    ) -> RepoResult<Vec<ServiceProvider>>;
    // Validated, emergency-ready providers with a known location.
    async fn list_emergency_ready(&self) -> RepoResult<Vec<ServiceProvider>>;
    async fn get_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>>;
    async fn phone_registered(&self, phone: &str) -> RepoResult<bool>;
    // Conflict when the phone or email is taken.
    async fn create_service_provider(
        &self,
        sp: NewServiceProvider,
    ) -> RepoResult<ServiceProvider>;
    async fn validate_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>>;
    // Sets status `banned` and state `not_ready`.
    async fn ban_service_provider(&self, id: Uuid) -> RepoResult<Option<ServiceProvider>>;
    async fn set_provider_state(
        &self,
        id: Uuid,
        state: SpState,
    ) -> RepoResult<Option<ServiceProvider>>;
    async fn set_provider_services(
        &self,
        id: Uuid,
        services: Vec<String>,
    ) -> RepoResult<Option<ServiceProvider>>;
    async fn set_provider_picture(
        &self,
        id: Uuid,
        picture: String,
    ) -> RepoResult<Option<ServiceProvider>>;
    async fn set_percent_to_pay(
        &self,
        id: Uuid,
        percent: f64,
    ) -> RepoResult<Option<ServiceProvider>>;

    // --- Payments & interventions ---
    async fn list_payments(&self, provider_id: Uuid) -> RepoResult<Vec<Payment>>;
    // Records the payment and lowers `amount_to_pay` by `amount`, never below zero.
    async fn add_payment(
        &self,
        provider_id: Uuid,
        amount: f64,
        date: DateTime<Utc>,
    ) -> RepoResult<Option<Payment>>;
    async fn list_interventions(&self, provider_id: Uuid) -> RepoResult<Vec<Intervention>>;

    // --- Commands ---
    async fn list_commands(&self, scope: CommandScope) -> RepoResult<Vec<Command>>;
    async fn get_command(&self, id: Uuid) -> RepoResult<Option<Command>>;
    async fn create_command(&self, command: NewCommand) -> RepoResult<Command>;
    /// Moves a command to `next`, atomically. Conflict when the transition is illegal.
    /// Completing a command records an intervention and credits the provider: `total`
    /// to `balance`, `total * percent_to_pay / 100` to `amount_to_pay`.
    async fn update_command_status(
        &self,
        id: Uuid,
        next: CommandStatus,
    ) -> RepoResult<Option<Command>>;
    async fn delete_command(&self, id: Uuid) -> RepoResult<Option<Command>>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

pub(crate) fn transition_conflict(from: CommandStatus, to: CommandStatus) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "Cannot change a {} command to {}.",
        status_name(from),
        status_name(to)
    ))
}

fn status_name(status: CommandStatus) -> &'static str {
    match status {
        CommandStatus::Pending => "pending",
        CommandStatus::Canceled => "canceled",
        CommandStatus::Completed => "completed",
    }
}

/// Share of a completed command's total owed to the platform.
pub(crate) fn commission(total: f64, percent_to_pay: f64) -> f64 {
    ((total * percent_to_pay / 100.0) * 100.0).round() / 100.0
}
