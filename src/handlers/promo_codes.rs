use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, Authorized, Stores},
    errors::ApiError,
    extract::{ObjectId, ValidatedJson},
    models::{CreatePromoCodeRequest, PromoCode, UpdatePromoCodeRequest},
};

/// get_promo_codes
///
/// [Public Route] Lists every promo code, newest first.
#[utoipa::path(
    get,
    path = "/api/promoCodes",
    responses((status = 200, description = "Promo codes", body = [PromoCode]))
)]
pub async fn get_promo_codes(
    State(state): State<AppState>,
) -> Result<Json<Vec<PromoCode>>, ApiError> {
    Ok(Json(state.repo.list_promo_codes().await?))
}

#[utoipa::path(
    get,
    path = "/api/promoCodes/{id}",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    responses(
        (status = 200, description = "Found", body = PromoCode),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_promo_code(
    _user: AuthUser,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<PromoCode>, ApiError> {
    state
        .repo
        .get_promo_code(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("promo code"))
}

/// create_promo_code
///
/// [Store Route] Creates a promo code. The code is stored upper-cased; `active` defaults
/// to true.
#[utoipa::path(
    post,
    path = "/api/promoCodes",
    request_body = CreatePromoCodeRequest,
    responses(
        (status = 201, description = "Created", body = PromoCode),
        (status = 409, description = "Code already exists")
    )
)]
pub async fn create_promo_code(
    _store: Authorized<Stores>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePromoCodeRequest>,
) -> Result<(StatusCode, Json<PromoCode>), ApiError> {
    let promo = state.repo.create_promo_code(payload).await?;
    tracing::info!(code = %promo.code, "promo code created");
    Ok((StatusCode::CREATED, Json(promo)))
}

#[utoipa::path(
    put,
    path = "/api/promoCodes/{id}",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    request_body = UpdatePromoCodeRequest,
    responses(
        (status = 200, description = "Updated", body = PromoCode),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_promo_code(
    _store: Authorized<Stores>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdatePromoCodeRequest>,
) -> Result<Json<PromoCode>, ApiError> {
    state
        .repo
        .update_promo_code(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("promo code"))
}

/// delete_promo_code
///
/// [Store Route] Deletes a promo code and returns it. Commands that already used the
/// code keep their recorded discount.
#[utoipa::path(
    delete,
    path = "/api/promoCodes/{id}",
    params(("id" = Uuid, Path, description = "Promo code ID")),
    responses(
        (status = 200, description = "Deleted", body = PromoCode),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_promo_code(
    _store: Authorized<Stores>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<PromoCode>, ApiError> {
    state
        .repo
        .delete_promo_code(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("promo code"))
}
