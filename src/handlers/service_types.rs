use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{Admins, Authorized},
    errors::ApiError,
    extract::{ObjectId, ValidatedJson},
    models::{ServiceRequest, ServiceType, ServiceTypeRequest},
};

/// get_service_types
///
/// [Public Route] Lists service types with their services embedded.
#[utoipa::path(
    get,
    path = "/api/serviceTypes",
    responses((status = 200, description = "Service types", body = [ServiceType]))
)]
pub async fn get_service_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceType>>, ApiError> {
    Ok(Json(state.repo.list_service_types().await?))
}

#[utoipa::path(
    get,
    path = "/api/serviceTypes/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    responses(
        (status = 200, description = "Found", body = ServiceType),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_service_type(
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<ServiceType>, ApiError> {
    state
        .repo
        .get_service_type(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("service type"))
}

#[utoipa::path(
    post,
    path = "/api/serviceTypes",
    request_body = ServiceTypeRequest,
    responses(
        (status = 201, description = "Created", body = ServiceType),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_service_type(
    _admin: Authorized<Admins>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ServiceTypeRequest>,
) -> Result<(StatusCode, Json<ServiceType>), ApiError> {
    let service_type = state.repo.create_service_type(payload).await?;
    tracing::info!(service_type_id = %service_type.id, "service type created");
    Ok((StatusCode::CREATED, Json(service_type)))
}

/// add_service
///
/// [Admin Route] Appends a service to a type and returns the updated type.
#[utoipa::path(
    post,
    path = "/api/serviceTypes/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    request_body = ServiceRequest,
    responses(
        (status = 201, description = "Service added", body = ServiceType),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_service(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ServiceRequest>,
) -> Result<(StatusCode, Json<ServiceType>), ApiError> {
    state
        .repo
        .add_service(id, payload)
        .await?
        .map(|service_type| (StatusCode::CREATED, Json(service_type)))
        .ok_or_else(|| ApiError::not_found("service type"))
}

/// delete_service
///
/// [Admin Route] Removes one service from a type and returns the updated type.
#[utoipa::path(
    delete,
    path = "/api/serviceTypes/{id}/services/{service_id}",
    params(
        ("id" = Uuid, Path, description = "Service type ID"),
        ("service_id" = Uuid, Path, description = "Service ID")
    ),
    responses(
        (status = 200, description = "Service removed", body = ServiceType),
        (status = 404, description = "Type or service not found")
    )
)]
pub async fn delete_service(
    _admin: Authorized<Admins>,
    ObjectId((id, service_id)): ObjectId<(Uuid, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<ServiceType>, ApiError> {
    state
        .repo
        .remove_service(id, service_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("service type"))
}

/// update_service_type
///
/// [Admin Route] Replaces name and description; the services list is left untouched.
#[utoipa::path(
    put,
    path = "/api/serviceTypes/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    request_body = ServiceTypeRequest,
    responses(
        (status = 200, description = "Updated", body = ServiceType),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_service_type(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ServiceTypeRequest>,
) -> Result<Json<ServiceType>, ApiError> {
    state
        .repo
        .update_service_type(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("service type"))
}

#[utoipa::path(
    delete,
    path = "/api/serviceTypes/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    responses(
        (status = 200, description = "Deleted", body = ServiceType),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_service_type(
    _admin: Authorized<Admins>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<ServiceType>, ApiError> {
    state
        .repo
        .delete_service_type(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("service type"))
}
