use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use super::discard_file;
use crate::{
    AppState,
    auth::{AuthUser, Authorized, Stores},
    errors::ApiError,
    extract::{ObjectId, ValidatedJson},
    models::{Category, CreateCategoryRequest, UpdateCategoryRequest},
    uploads::{self, FileRule, MultipartBody},
    validation::Validate,
};

const IMAGE: FileRule = FileRule::image("image");
const PREFIX: &str = "categories";

/// get_categories
///
/// [Authenticated Route] Lists every category, ordered by name.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn get_categories(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// get_category
///
/// [Authenticated Route] Retrieves one category.
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    _user: AuthUser,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<Json<Category>, ApiError> {
    state
        .repo
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("category"))
}

/// create_category
///
/// [Store Route] Creates a category from a multipart form: `name`, `description` and an
/// optional single `image`. The image is stored only once the text fields are valid.
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body(content = CreateCategoryRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Invalid form"),
        (status = 409, description = "Name already used")
    )
)]
pub async fn create_category(
    _store: Authorized<Stores>,
    State(state): State<AppState>,
    body: MultipartBody,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let mut form = uploads::read_multipart(body, &[IMAGE]).await?;

    let payload = CreateCategoryRequest {
        name: form.fields.remove("name").unwrap_or_default(),
        description: form.fields.remove("description").filter(|d| !d.trim().is_empty()),
    };
    payload.validate()?;

    let image = match form.take_one(IMAGE.name) {
        Some(file) => Some(uploads::store_file(&state.storage, PREFIX, file).await?),
        None => None,
    };

    match state.repo.create_category(payload, image.clone()).await {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "category created");
            Ok((StatusCode::CREATED, Json(category)))
        }
        Err(e) => {
            if let Some(key) = image {
                discard_file(&state.storage, &key).await;
            }
            Err(e.into())
        }
    }
}

/// update_category
///
/// [Store Route] Partially updates a category's name and description.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    _store: Authorized<Stores>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    state
        .repo
        .update_category(id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("category"))
}

/// update_category_image
///
/// [Store Route] Replaces the image of an existing category. Existence is checked before
/// the upload is read, so nothing is stored for a missing category.
#[utoipa::path(
    put,
    path = "/api/categories/{id}/image",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Image replaced", body = Category),
        (status = 400, description = "Missing or invalid image"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category_image(
    _store: Authorized<Stores>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
    body: MultipartBody,
) -> Result<Json<Category>, ApiError> {
    let existing = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("category"))?;

    let mut form = uploads::read_multipart(body, &[IMAGE]).await?;
    let file = form
        .take_one(IMAGE.name)
        .ok_or_else(|| ApiError::Upload("\"image\" is required.".to_string()))?;
    let key = uploads::store_file(&state.storage, PREFIX, file).await?;

    let Some(category) = state.repo.set_category_image(id, key.clone()).await? else {
        discard_file(&state.storage, &key).await;
        return Err(ApiError::not_found("category"));
    };
    if let Some(old) = existing.image {
        discard_file(&state.storage, &old).await;
    }
    Ok(Json(category))
}

/// delete_category
///
/// [Store Route] Deletes a category and its stored image.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    _store: Authorized<Stores>,
    ObjectId(id): ObjectId,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let category = state
        .repo
        .delete_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("category"))?;
    if let Some(image) = category.image {
        discard_file(&state.storage, &image).await;
    }
    Ok(StatusCode::NO_CONTENT)
}
