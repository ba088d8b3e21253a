//! Persistence records and request/response schemas, one module per resource.

pub mod account;
pub mod category;
pub mod command;
pub mod promo_code;
pub mod service_provider;
pub mod service_type;
pub mod wilayas;

pub use account::{Account, AuthResponse, CreateAccountRequest, LoginRequest, NewAccount, RegisterAccountRequest, TokenResponse};
pub use category::{Category, CreateCategoryRequest, UpdateCategoryRequest};
pub use command::{Command, CommandKind, CommandScope, CommandStatus, CreateCommandRequest, Intervention, NewCommand, UpdateCommandStatusRequest};
pub use promo_code::{CreatePromoCodeRequest, PromoCode, UpdatePromoCodeRequest};
pub use service_provider::{
    AddPaymentRequest, AvailabilityFilter, BalanceResponse, ClosestProvider, ClosestRequest,
    Diploma, DiplomaType, Gender, NewServiceProvider, Payment, ProviderFilter,
    RegisterServiceProviderRequest, RegisteredProvider, RegistrationFiles, ServiceProvider,
    SetPercentToPayRequest,
    SetServicesRequest, SetStateRequest, SpState, SpStatus, VerifyPhoneRequest,
    VerifyPhoneResponse,
};
pub use service_type::{Service, ServiceRequest, ServiceType, ServiceTypeRequest};
