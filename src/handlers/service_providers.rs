use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use super::discard_file;
use crate::{
    AppState,
    auth::{self, Admins, AdminsOrProviders, Authorized, Clients, Role, ServiceProviders},
    errors::ApiError,
    extract::{ApiQuery, ObjectId, ValidatedJson},
    geo,
    models::{
        AddPaymentRequest, AvailabilityFilter, BalanceResponse, ClosestProvider, ClosestRequest,
        Command, CommandScope, Intervention, NewServiceProvider, Payment, ProviderFilter,
        RegisterServiceProviderRequest, RegisteredProvider, RegistrationFiles, ServiceProvider,
        SetPercentToPayRequest, SetServicesRequest, SetStateRequest, VerifyPhoneRequest,
        VerifyPhoneResponse,
    },
    storage::StorageState,
    uploads::{self, FileRule, MultipartBody, MultipartForm},
    validation::Validate,
};

const PREFIX: &str = "service-providers";
const PICTURE: FileRule = FileRule::image("picture");
const BIRTH_CERTIFICATE: FileRule = FileRule::document("extNaissance");
const RESIDENCE: FileRule = FileRule::document("residence");
const ID_CARD: FileRule = FileRule::document("idCard");
const CRIMINAL_RECORD: FileRule = FileRule::document("casierJudiciaire");
const DOCS: FileRule = FileRule::documents("docs");

const REGISTRATION_FILES: &[FileRule] = &[
    PICTURE,
    BIRTH_CERTIFICATE,
    RESIDENCE,
    ID_CARD,
    CRIMINAL_RECORD,
    DOCS,
];

async fn find_provider(state: &AppState, id: Uuid) -> Result<ServiceProvider, ApiError> {
    state
        .repo
        .get_service_provider(id)
        .await?
        .ok_or_else(|| ApiError::not_found("service provider"))
}

fn found(sp: Option<ServiceProvider>) -> Result<Json<ServiceProvider>, ApiError> {
    sp.map(Json)
        .ok_or_else(|| ApiError::not_found("service provider"))
}

async fn store_optional(
    storage: &StorageState,
    form: &mut MultipartForm,
    rule: FileRule,
    stored: &mut Vec<String>,
) -> Result<Option<String>, ApiError> {
    let Some(file) = form.take_one(rule.name) else {
        return Ok(None);
    };
    let key = uploads::store_file(storage, PREFIX, file).await?;
    stored.push(key.clone());
    Ok(Some(key))
}

/// Stores every registration upload. On a storage failure the files already written
/// are removed again.
async fn store_registration_files(
    storage: &StorageState,
    form: &mut MultipartForm,
) -> Result<RegistrationFiles, ApiError> {
    let mut stored = Vec::new();
    let result = async {
        let picture = store_optional(storage, form, PICTURE, &mut stored).await?;
        let birth_certificate =
            store_optional(storage, form, BIRTH_CERTIFICATE, &mut stored).await?;
        let residence_certificate = store_optional(storage, form, RESIDENCE, &mut stored).await?;
        let id_card = store_optional(storage, form, ID_CARD, &mut stored).await?;
        let criminal_record = store_optional(storage, form, CRIMINAL_RECORD, &mut stored).await?;

        let mut docs = Vec::new();
        for file in form.take_all(DOCS.name) {
            let key = uploads::store_file(storage, PREFIX, file).await?;
            stored.push(key.clone());
            docs.push(key);
        }

        Ok::<_, ApiError>(RegistrationFiles {
            picture,
            birth_certificate,
            residence_certificate,
            id_card,
            criminal_record,
            docs,
        })
    }
    .await;

    if result.is_err() {
        for key in &stored {
            discard_file(storage, key).await;
        }
    }
    result
}

/// register_service_provider
///
/// [Public Route] Registers a service provider from a multipart form.
///
/// *Flow*: files are checked against their field rules, the text fields (with the
/// JSON-encoded `services`, `types` and `descriptions`) are parsed and validated, and only
/// then are the files stored. Each `docs[i]` becomes a diploma typed by `types[i]`.
/// The response carries an access token with the `sp` role.
#[utoipa::path(
    post,
    path = "/api/serviceProviders/register",
    request_body(content_type = "multipart/form-data", description = "Registration form"),
    responses(
        (status = 201, description = "Registered", body = RegisteredProvider),
        (status = 400, description = "Invalid form or files"),
        (status = 409, description = "Phone or email already registered")
    )
)]
pub async fn register_service_provider(
    State(state): State<AppState>,
    body: MultipartBody,
) -> Result<(StatusCode, Json<RegisteredProvider>), ApiError> {
    let mut form = uploads::read_multipart(body, REGISTRATION_FILES).await?;

    let payload = RegisterServiceProviderRequest::from_form(&form.fields)?;
    payload.validate()?;
    let docs = form.files.get(DOCS.name).map_or(0, Vec::len);
    if docs != payload.types.len() {
        return Err(ApiError::Validation(format!(
            "{docs} documents were uploaded but {} types were given",
            payload.types.len()
        )));
    }

    let files = store_registration_files(&state.storage, &mut form).await?;
    let keys = files.keys();
    let created = match NewServiceProvider::from_registration(payload, files) {
        Ok(new_sp) => state.repo.create_service_provider(new_sp).await.map_err(ApiError::from),
        Err(e) => Err(e),
    };
    let service_provider = match created {
        Ok(sp) => sp,
        Err(e) => {
            for key in &keys {
                discard_file(&state.storage, key).await;
            }
            return Err(e);
        }
    };

    let token = auth::issue_token(
        &state.config,
        service_provider.id,
        vec![Role::ServiceProvider],
    )?;
    tracing::info!(service_provider_id = %service_provider.id, "service provider registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredProvider {
            token,
            service_provider,
        }),
    ))
}

/// set_profile_picture
///
/// [Provider Route] Replaces the caller's own profile picture.
#[utoipa::path(
    put,
    path = "/api/serviceProviders/{id}/picture",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    request_body(content_type = "multipart/form-data", description = "Single `picture` image"),
    responses(
        (status = 200, description = "Picture replaced", body = ServiceProvider),
        (status = 400, description = "Missing or invalid picture"),
        (status = 403, description = "Not the caller's record"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_profile_picture(
    Authorized { user, .. }: Authorized<ServiceProviders>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    body: MultipartBody,
) -> Result<Json<ServiceProvider>, ApiError> {
    user.ensure_self_or_admin(id)?;
    let existing = find_provider(&state, id).await?;

    let mut form = uploads::read_multipart(body, &[PICTURE]).await?;
    let file = form
        .take_one(PICTURE.name)
        .ok_or_else(|| ApiError::Upload("\"picture\" is required.".to_string()))?;
    let key = uploads::store_file(&state.storage, PREFIX, file).await?;

    let Some(sp) = state.repo.set_provider_picture(id, key.clone()).await? else {
        discard_file(&state.storage, &key).await;
        return Err(ApiError::not_found("service provider"));
    };
    if let Some(old) = existing.picture {
        discard_file(&state.storage, &old).await;
    }
    Ok(Json(sp))
}

/// verify_phone
///
/// [Public Route] Tells the mobile client whether a phone number already belongs to a
/// registered provider.
#[utoipa::path(
    post,
    path = "/api/serviceProviders/verifyPhone",
    request_body = VerifyPhoneRequest,
    responses((status = 200, description = "Lookup result", body = VerifyPhoneResponse))
)]
pub async fn verify_phone(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<VerifyPhoneRequest>,
) -> Result<Json<VerifyPhoneResponse>, ApiError> {
    let registered = state.repo.phone_registered(&payload.phone).await?;
    Ok(Json(VerifyPhoneResponse { registered }))
}

/// closest_emergency_ready
///
/// [Public Route] Finds the nearest validated, emergency-ready provider to a point,
/// optionally restricted to a service. Distance is the haversine great-circle distance.
#[utoipa::path(
    post,
    path = "/api/serviceProviders/closest",
    request_body = ClosestRequest,
    responses(
        (status = 200, description = "Closest provider", body = ClosestProvider),
        (status = 404, description = "No provider available")
    )
)]
pub async fn closest_emergency_ready(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ClosestRequest>,
) -> Result<Json<ClosestProvider>, ApiError> {
    let candidates = state.repo.list_emergency_ready().await?;
    geo::closest(
        (payload.latitude, payload.longitude),
        &candidates,
        payload.service.as_deref(),
    )
    .map(Json)
    .ok_or_else(|| {
        ApiError::NotFound("No emergency-ready service provider is available.".to_string())
    })
}

/// get_service_providers
///
/// [Admin Route] Lists providers, optionally filtered by moderation status.
#[utoipa::path(
    get,
    path = "/api/serviceProviders",
    params(ProviderFilter),
    responses((status = 200, description = "Service providers", body = [ServiceProvider]))
)]
pub async fn get_service_providers(
    _admin: Authorized<Admins>,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProviderFilter>,
) -> Result<Json<Vec<ServiceProvider>>, ApiError> {
    Ok(Json(state.repo.list_service_providers(filter.status).await?))
}

/// get_my_balance
///
/// [Provider Route] The caller's balance, outstanding amount and commission rate.
#[utoipa::path(
    get,
    path = "/api/serviceProviders/me/balance",
    responses((status = 200, description = "Balance", body = BalanceResponse))
)]
pub async fn get_my_balance(
    Authorized { user, .. }: Authorized<ServiceProviders>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let sp = find_provider(&state, user.id).await?;
    Ok(Json(BalanceResponse::from(&sp)))
}

/// get_available
///
/// [Client Route] Validated providers that are ready or emergency-ready, optionally
/// filtered by service and wilaya.
#[utoipa::path(
    get,
    path = "/api/serviceProviders/available",
    params(AvailabilityFilter),
    responses((status = 200, description = "Available providers", body = [ServiceProvider]))
)]
pub async fn get_available(
    _client: Authorized<Clients>,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<AvailabilityFilter>,
) -> Result<Json<Vec<ServiceProvider>>, ApiError> {
    Ok(Json(state.repo.list_available_providers(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/serviceProviders/{id}",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    responses(
        (status = 200, description = "Found", body = ServiceProvider),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_service_provider(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<ServiceProvider>, ApiError> {
    found(state.repo.get_service_provider(id).await?)
}

/// get_interventions
///
/// [Admin or Provider Route] Interventions carried out by a provider. Providers may only
/// read their own.
#[utoipa::path(
    get,
    path = "/api/serviceProviders/{id}/interventions",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    responses(
        (status = 200, description = "Interventions", body = [Intervention]),
        (status = 403, description = "Another provider's record"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_interventions(
    Authorized { user, .. }: Authorized<AdminsOrProviders>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<Vec<Intervention>>, ApiError> {
    user.ensure_self_or_admin(id)?;
    find_provider(&state, id).await?;
    Ok(Json(state.repo.list_interventions(id).await?))
}

/// get_commands
///
/// [Admin or Provider Route] Commands addressed to a provider. Providers may only read
/// their own.
#[utoipa::path(
    get,
    path = "/api/serviceProviders/{id}/commands",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    responses(
        (status = 200, description = "Commands", body = [Command]),
        (status = 403, description = "Another provider's record"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_commands(
    Authorized { user, .. }: Authorized<AdminsOrProviders>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<Vec<Command>>, ApiError> {
    user.ensure_self_or_admin(id)?;
    find_provider(&state, id).await?;
    Ok(Json(state.repo.list_commands(CommandScope::Provider(id)).await?))
}

#[utoipa::path(
    get,
    path = "/api/serviceProviders/{id}/payments",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    responses(
        (status = 200, description = "Payments", body = [Payment]),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_payments(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    find_provider(&state, id).await?;
    Ok(Json(state.repo.list_payments(id).await?))
}

/// add_payment
///
/// [Admin Route] Records a payment from the provider in the path. `amount_to_pay` goes
/// down by the amount and never below zero; `date` defaults to now.
#[utoipa::path(
    post,
    path = "/api/serviceProviders/{id}/payments",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    request_body = AddPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_payment(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<AddPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let date = payload.date.unwrap_or_else(Utc::now);
    let payment = state
        .repo
        .add_payment(id, payload.amount, date)
        .await?
        .ok_or_else(|| ApiError::not_found("service provider"))?;
    tracing::info!(service_provider_id = %id, amount = payment.amount, "payment recorded");
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    put,
    path = "/api/serviceProviders/{id}/validate",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    responses(
        (status = 200, description = "Validated", body = ServiceProvider),
        (status = 404, description = "Not Found")
    )
)]
pub async fn validate_service_provider(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<ServiceProvider>, ApiError> {
    found(state.repo.validate_service_provider(id).await?)
}

#[utoipa::path(
    put,
    path = "/api/serviceProviders/{id}/percentToPay",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    request_body = SetPercentToPayRequest,
    responses(
        (status = 200, description = "Updated", body = ServiceProvider),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_percent_to_pay(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SetPercentToPayRequest>,
) -> Result<Json<ServiceProvider>, ApiError> {
    found(state.repo.set_percent_to_pay(id, payload.percent_to_pay).await?)
}

/// set_state
///
/// [Provider Route] Lets a validated provider declare its own availability.
#[utoipa::path(
    put,
    path = "/api/serviceProviders/{id}/state",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    request_body = SetStateRequest,
    responses(
        (status = 200, description = "Updated", body = ServiceProvider),
        (status = 403, description = "Another provider's record, or not validated yet"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_state(
    Authorized { user, .. }: Authorized<ServiceProviders>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SetStateRequest>,
) -> Result<Json<ServiceProvider>, ApiError> {
    user.ensure_self_or_admin(id)?;
    let sp = find_provider(&state, id).await?;
    if !sp.is_validated() {
        return Err(ApiError::ForbiddenWith(
            "Your account has not been validated yet.".to_string(),
        ));
    }
    found(state.repo.set_provider_state(id, payload.state).await?)
}

#[utoipa::path(
    put,
    path = "/api/serviceProviders/{id}/services",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    request_body = SetServicesRequest,
    responses(
        (status = 200, description = "Updated", body = ServiceProvider),
        (status = 403, description = "Another provider's record"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_services(
    Authorized { user, .. }: Authorized<ServiceProviders>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SetServicesRequest>,
) -> Result<Json<ServiceProvider>, ApiError> {
    user.ensure_self_or_admin(id)?;
    found(state.repo.set_provider_services(id, payload.services).await?)
}

/// ban_service_provider
///
/// [Admin Route] Bans a provider: status becomes `banned` and state `not_ready`. Banned
/// providers are refused by the authentication extractor from then on.
#[utoipa::path(
    put,
    path = "/api/serviceProviders/{id}/ban",
    params(("id" = Uuid, Path, description = "Service provider ID")),
    responses(
        (status = 200, description = "Banned", body = ServiceProvider),
        (status = 404, description = "Not Found")
    )
)]
pub async fn ban_service_provider(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<ServiceProvider>, ApiError> {
    let sp = found(state.repo.ban_service_provider(id).await?)?;
    tracing::warn!(service_provider_id = %id, "service provider banned");
    Ok(sp)
}
