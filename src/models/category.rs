use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    validation::{self, Validate},
};

/// Category
///
/// A store-managed grouping of services, optionally illustrated by an uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    // Storage key of the category image.
    pub image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Text part of the multipart create form (`name`, `description`); the optional image
/// travels alongside it as a file field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::length("name", &self.name, 2, 50)?;
        validation::optional_length("description", self.description.as_deref(), 0, 255)
    }
}

/// Partial update; at least one field must be present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for UpdateCategoryRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_none() && self.description.is_none() {
            return Err(ApiError::Validation(
                "\"value\" must contain at least one of [name, description]".to_string(),
            ));
        }
        validation::optional_length("name", self.name.as_deref(), 2, 50)?;
        validation::optional_length("description", self.description.as_deref(), 0, 255)
    }
}
