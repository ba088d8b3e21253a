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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "command_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CommandStatus {
    #[default]
    Pending,
    Canceled,
    Completed,
}

impl CommandStatus {
    /// `pending` is the only non-terminal status; it may move to either terminal one.
    pub fn can_transition_to(self, next: CommandStatus) -> bool {
        matches!(
            (self, next),
            (CommandStatus::Pending, CommandStatus::Canceled)
                | (CommandStatus::Pending, CommandStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "command_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CommandKind {
    Rent,
    Buy,
    #[default]
    Both,
}

/// Command
///
/// A client's order addressed to one service provider. Prices are fixed at creation:
/// `total` is `price` with the promo code discount applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Command {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_provider_id: Uuid,
    pub service_type_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub description: Option<String>,
    pub address: String,
    pub price: f64,
    pub promo_code: Option<String>,
    pub discount: i32,
    pub total: f64,
    pub status: CommandStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Command {
    pub fn is_visible_to_client(&self, client_id: Uuid) -> bool {
        self.client_id == client_id
    }

    pub fn is_assigned_to(&self, provider_id: Uuid) -> bool {
        self.service_provider_id == provider_id
    }
}

/// Intervention
///
/// The record of a provider carrying out a command, written when the command completes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Intervention {
    pub id: Uuid,
    pub service_provider_id: Uuid,
    pub command_id: Uuid,
    pub amount: f64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreateCommandRequest {
    pub service_provider_id: Uuid,
    pub service_type_id: Option<Uuid>,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    pub description: Option<String>,
    pub address: String,
    pub price: f64,
    pub promo_code: Option<String>,
}

impl Validate for CreateCommandRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::length("address", &self.address, 1, 255)?;
        validation::optional_length("description", self.description.as_deref(), 0, 255)?;
        validation::non_negative("price", self.price)?;
        if let Some(code) = &self.promo_code {
            validation::promo_code(code)?;
        }
        Ok(())
    }
}

/// Insert payload for `commands`, with the discount already resolved.
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub client_id: Uuid,
    pub service_provider_id: Uuid,
    pub service_type_id: Option<Uuid>,
    pub kind: CommandKind,
    pub description: Option<String>,
    pub address: String,
    pub price: f64,
    pub promo_code: Option<String>,
    pub discount: i32,
    pub total: f64,
}

impl NewCommand {
    pub fn new(client_id: Uuid, req: CreateCommandRequest, promo_code: Option<(String, i32)>) -> Self {
        let (promo_code, discount) = match promo_code {
            Some((code, discount)) => (Some(code), discount),
            None => (None, 0),
        };
        Self {
            client_id,
            service_provider_id: req.service_provider_id,
            service_type_id: req.service_type_id,
            kind: req.kind,
            description: req.description,
            address: req.address,
            price: req.price,
            promo_code,
            discount,
            total: apply_discount(req.price, discount),
        }
    }
}

/// Applies a percent discount and rounds to the cent.
pub fn apply_discount(price: f64, discount: i32) -> f64 {
    let discounted = price * (1.0 - f64::from(discount.clamp(0, 100)) / 100.0);
    (discounted * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCommandStatusRequest {
    pub status: CommandStatus,
}

impl Validate for UpdateCommandStatusRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.status == CommandStatus::Pending {
            return Err(ApiError::Validation(
                "\"status\" must be one of [canceled, completed]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which commands a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
    All,
    Client(Uuid),
    Provider(Uuid),
}

impl CommandScope {
    pub fn includes(&self, command: &Command) -> bool {
        match self {
            CommandScope::All => true,
            CommandScope::Client(id) => command.is_visible_to_client(*id),
            CommandScope::Provider(id) => command.is_assigned_to(*id),
        }
    }
}
