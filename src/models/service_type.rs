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

/// ServiceType
///
/// An admin-curated family of services (e.g. "Plumbing") with the concrete services it
/// offers embedded. The `services` column is aggregated from the `services` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ServiceType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(json)]
    pub services: Vec<Service>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// Body for creating and (fully) replacing a service type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ServiceTypeRequest {
    pub name: String,
    pub description: Option<String>,
}

impl Validate for ServiceTypeRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::length("name", &self.name, 2, 50)?;
        validation::optional_length("description", self.description.as_deref(), 0, 255)
    }
}

/// Body for adding a service to an existing type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct ServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl Validate for ServiceRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::length("name", &self.name, 2, 50)?;
        validation::optional_length("description", self.description.as_deref(), 0, 255)?;
        if let Some(price) = self.price {
            validation::non_negative("price", price)?;
        }
        Ok(())
    }
}
