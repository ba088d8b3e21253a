use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    validation::{self, Validate},
};

/// PromoCode
///
/// A percentage discount that clients may attach to a command while it is active and
/// not expired. Codes are stored upper-cased and are unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    // Percent off, 1..=100.
    pub discount: i32,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct CreatePromoCodeRequest {
    pub code: String,
    pub discount: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

impl Validate for CreatePromoCodeRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::promo_code(&self.code)?;
        validation::range("discount", f64::from(self.discount), 1.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdatePromoCodeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<i32>,
    /// Absent leaves the expiry alone; `null` removes it.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Wraps a present field (including an explicit `null`) in `Some`, so a missing field
/// and `null` stay distinguishable.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Validate for UpdatePromoCodeRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.code.is_none()
            && self.discount.is_none()
            && self.expires_at.is_none()
            && self.active.is_none()
        {
            return Err(ApiError::Validation(
                "\"value\" must contain at least one of [code, discount, expires_at, active]"
                    .to_string(),
            ));
        }
        if let Some(code) = &self.code {
            validation::promo_code(code)?;
        }
        if let Some(discount) = self.discount {
            validation::range("discount", f64::from(discount), 1.0, 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expired_or_inactive_codes_are_not_usable() {
        let now = Utc::now();
        let mut code = PromoCode {
            active: true,
            expires_at: Some(now + Duration::days(1)),
            ..PromoCode::default()
        };
        assert!(code.is_usable(now));

        code.expires_at = Some(now - Duration::seconds(1));
        assert!(!code.is_usable(now));

        code.expires_at = None;
        assert!(code.is_usable(now));

        code.active = false;
        assert!(!code.is_usable(now));
    }

    #[test]
    fn null_expiry_is_kept_apart_from_a_missing_one() {
        let clear: UpdatePromoCodeRequest =
            serde_json::from_str(r#"{"expires_at": null}"#).unwrap();
        assert_eq!(clear.expires_at, Some(None));
        assert!(clear.validate().is_ok());

        let untouched: UpdatePromoCodeRequest =
            serde_json::from_str(r#"{"active": true}"#).unwrap();
        assert_eq!(untouched.expires_at, None);

        let set: UpdatePromoCodeRequest =
            serde_json::from_str(r#"{"expires_at": "2030-01-01T00:00:00Z"}"#).unwrap();
        assert!(matches!(set.expires_at, Some(Some(_))));
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(UpdatePromoCodeRequest::default().validate().is_err());
        let update = UpdatePromoCodeRequest {
            active: Some(false),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }
}
