use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    models::wilayas,
    validation::{self, Validate},
};

// --- Enumerations (mapped to Postgres enum types) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(ApiError::Validation(
                "\"gender\" must be one of [male, female]".to_string(),
            )),
        }
    }
}

/// Availability declared by the provider itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "sp_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SpState {
    #[default]
    NotReady,
    Ready,
    EmergencyReady,
}

/// Moderation status, driven by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default)]
#[sqlx(type_name = "sp_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SpStatus {
    #[default]
    NotValidated,
    Validated,
    Banned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DiplomaType {
    Bac,
    Licence,
    Master,
    Doctorate,
    Professional,
    Other,
}

impl FromStr for DiplomaType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bac" => Ok(DiplomaType::Bac),
            "licence" => Ok(DiplomaType::Licence),
            "master" => Ok(DiplomaType::Master),
            "doctorate" => Ok(DiplomaType::Doctorate),
            "professional" => Ok(DiplomaType::Professional),
            "other" => Ok(DiplomaType::Other),
            _ => Err(ApiError::Validation(
                "\"types\" items must be one of [bac, licence, master, doctorate, professional, other]"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Diploma {
    #[serde(rename = "type")]
    pub kind: DiplomaType,
    pub description: Option<String>,
    // Storage key of the scanned diploma.
    pub file: Option<String>,
}

// --- Core record ---

/// ServiceProvider
///
/// A marketplace actor offering services. Registers with identity documents, is validated
/// (or banned) by admins, and then toggles its own availability through `state`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ServiceProvider {
    pub id: Uuid,
    pub phone: String,
    pub firstname: String,
    pub lastname: String,
    pub gender: Gender,
    #[ts(type = "string")]
    pub birthdate: NaiveDate,
    pub wilaya: String,
    pub commune: String,
    pub job_title: String,
    pub description: Option<String>,
    pub email: String,
    pub balance: f64,
    pub amount_to_pay: f64,
    pub percent_to_pay: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub services: Vec<String>,
    pub picture: Option<String>,
    // Storage keys of the identity documents uploaded at registration.
    pub birth_certificate: Option<String>,
    pub residence_certificate: Option<String>,
    pub id_card: Option<String>,
    pub criminal_record: Option<String>,
    #[sqlx(json)]
    pub diplomas: Vec<Diploma>,
    pub state: SpState,
    pub status: SpStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl ServiceProvider {
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn is_validated(&self) -> bool {
        self.status == SpStatus::Validated
    }

    pub fn is_available(&self) -> bool {
        self.is_validated() && matches!(self.state, SpState::Ready | SpState::EmergencyReady)
    }

    pub fn offers(&self, service: &str) -> bool {
        self.services.iter().any(|s| s.eq_ignore_ascii_case(service))
    }
}

/// Payment
///
/// A settlement made by a provider towards its `amount_to_pay`, recorded by an admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Payment {
    pub id: Uuid,
    pub service_provider_id: Uuid,
    pub amount: f64,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
}

// --- Registration ---

/// RegisterServiceProviderRequest
///
/// The text part of the multipart registration form. `services`, `types` and
/// `descriptions` arrive as JSON-encoded arrays; `types[i]`/`descriptions[i]` describe
/// the i-th uploaded `docs` file.
#[derive(Debug, Clone, Default)]
pub struct RegisterServiceProviderRequest {
    pub phone: String,
    pub firstname: String,
    pub lastname: String,
    pub gender: Option<Gender>,
    pub birthdate: Option<NaiveDate>,
    pub wilaya: String,
    pub commune: String,
    pub job_title: String,
    pub description: Option<String>,
    pub email: String,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub services: Vec<String>,
    pub types: Vec<DiplomaType>,
    pub descriptions: Vec<String>,
}

fn text<'a>(fields: &'a HashMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

fn number(fields: &HashMap<String, String>, name: &str) -> Result<Option<f64>, ApiError> {
    text(fields, &[name])
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| ApiError::Validation(format!("\"{name}\" must be a number")))
        })
        .transpose()
}

fn json_strings(fields: &HashMap<String, String>, name: &str) -> Result<Vec<String>, ApiError> {
    match text(fields, &[name]) {
        Some(raw) => serde_json::from_str::<Vec<String>>(raw)
            .map_err(|_| ApiError::Validation(format!("\"{name}\" must be a JSON array of strings"))),
        None => Ok(Vec::new()),
    }
}

fn parse_birthdate(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::Validation("\"birthdate\" must be a valid date".to_string()))
}

impl RegisterServiceProviderRequest {
    /// Builds the request from multipart text fields. Malformed JSON arrays, numbers or
    /// enum values are rejected here; range and length rules are left to `validate`.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, ApiError> {
        let owned = |names: &[&str]| text(fields, names).unwrap_or_default().to_string();

        let gender = text(fields, &["gender"]).map(str::parse::<Gender>).transpose()?;
        let birthdate = text(fields, &["birthdate"]).map(parse_birthdate).transpose()?;
        let types = json_strings(fields, "types")?
            .iter()
            .map(|t| t.parse::<DiplomaType>())
            .collect::<Result<Vec<DiplomaType>, _>>()?;

        Ok(Self {
            phone: owned(&["phone"]),
            firstname: owned(&["firstname"]),
            lastname: owned(&["lastname"]),
            gender,
            birthdate,
            wilaya: owned(&["wilaya"]),
            commune: owned(&["commune"]),
            job_title: owned(&["jobTitle", "job_title"]),
            description: text(fields, &["description"]).map(str::to_string),
            email: owned(&["email"]),
            rating: number(fields, "rating")?,
            latitude: number(fields, "latitude")?,
            longitude: number(fields, "longitude")?,
            services: json_strings(fields, "services")?,
            types,
            descriptions: json_strings(fields, "descriptions")?,
        })
    }
}

impl Validate for RegisterServiceProviderRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.phone.is_empty() {
            return Err(ApiError::Validation("User phone number required".to_string()));
        }
        validation::phone(&self.phone)?;
        validation::length("firstname", &self.firstname, 2, 50)?;
        validation::length("lastname", &self.lastname, 2, 50)?;
        if self.gender.is_none() {
            return Err(ApiError::Validation("\"gender\" is required".to_string()));
        }
        if self.birthdate.is_none() {
            return Err(ApiError::Validation("\"birthdate\" is required".to_string()));
        }
        validation::length("jobTitle", &self.job_title, 1, 255)?;
        validation::optional_length("description", self.description.as_deref(), 0, 255)?;
        validation::email("email", &self.email)?;
        if !wilayas::is_wilaya(&self.wilaya) {
            return Err(ApiError::Validation(
                "\"wilaya\" must be one of the 58 wilayas".to_string(),
            ));
        }
        validation::length("commune", &self.commune, 1, 255)?;
        if let Some(rating) = self.rating {
            validation::range("rating", rating, 0.0, 5.0)?;
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                validation::range("latitude", lat, -90.0, 90.0)?;
                validation::range("longitude", lng, -180.0, 180.0)?;
            }
            (None, None) => {}
            _ => {
                return Err(ApiError::Validation(
                    "\"latitude\" and \"longitude\" must be provided together".to_string(),
                ));
            }
        }
        for service in &self.services {
            validation::length("services", service, 1, 50)?;
        }
        for description in &self.descriptions {
            validation::length("descriptions", description, 0, 255)?;
        }
        Ok(())
    }
}

/// Insert payload for `service_providers`, assembled once files have been stored.
#[derive(Debug, Clone)]
pub struct NewServiceProvider {
    pub phone: String,
    pub firstname: String,
    pub lastname: String,
    pub gender: Gender,
    pub birthdate: NaiveDate,
    pub wilaya: String,
    pub commune: String,
    pub job_title: String,
    pub description: Option<String>,
    pub email: String,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub services: Vec<String>,
    pub picture: Option<String>,
    pub birth_certificate: Option<String>,
    pub residence_certificate: Option<String>,
    pub id_card: Option<String>,
    pub criminal_record: Option<String>,
    pub diplomas: Vec<Diploma>,
}

/// Storage keys produced by the registration uploads.
#[derive(Debug, Clone, Default)]
pub struct RegistrationFiles {
    pub picture: Option<String>,
    pub birth_certificate: Option<String>,
    pub residence_certificate: Option<String>,
    pub id_card: Option<String>,
    pub criminal_record: Option<String>,
    pub docs: Vec<String>,
}

impl RegistrationFiles {
    /// Every stored key, for cleanup when the registration is rejected.
    pub fn keys(&self) -> Vec<String> {
        [
            &self.picture,
            &self.birth_certificate,
            &self.residence_certificate,
            &self.id_card,
            &self.criminal_record,
        ]
        .into_iter()
        .flatten()
        .chain(self.docs.iter())
        .cloned()
        .collect()
    }
}

impl NewServiceProvider {
    /// Pairs every stored `docs` key with its declared type and description.
    pub fn from_registration(
        req: RegisterServiceProviderRequest,
        files: RegistrationFiles,
    ) -> Result<Self, ApiError> {
        if files.docs.len() != req.types.len() {
            return Err(ApiError::Validation(format!(
                "{} documents were uploaded but {} types were given",
                files.docs.len(),
                req.types.len()
            )));
        }
        let diplomas = files
            .docs
            .into_iter()
            .zip(req.types.iter().copied())
            .enumerate()
            .map(|(i, (file, kind))| Diploma {
                kind,
                description: req.descriptions.get(i).cloned(),
                file: Some(file),
            })
            .collect();

        let (Some(gender), Some(birthdate)) = (req.gender, req.birthdate) else {
            return Err(ApiError::Validation("\"gender\" and \"birthdate\" are required".to_string()));
        };

        Ok(Self {
            phone: req.phone,
            firstname: req.firstname,
            lastname: req.lastname,
            gender,
            birthdate,
            wilaya: req.wilaya,
            commune: req.commune,
            job_title: req.job_title,
            description: req.description,
            email: req.email,
            rating: req.rating,
            latitude: req.latitude,
            longitude: req.longitude,
            services: req.services,
            picture: files.picture,
            birth_certificate: files.birth_certificate,
            residence_certificate: files.residence_certificate,
            id_card: files.id_card,
            criminal_record: files.criminal_record,
            diplomas,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisteredProvider {
    pub token: String,
    pub service_provider: ServiceProvider,
}

// --- Request/Response payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyPhoneRequest {
    pub phone: String,
}

impl Validate for VerifyPhoneRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::phone(&self.phone)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VerifyPhoneResponse {
    pub registered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClosestRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub service: Option<String>,
}

impl Validate for ClosestRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::range("latitude", self.latitude, -90.0, 90.0)?;
        validation::range("longitude", self.longitude, -180.0, 180.0)?;
        validation::optional_length("service", self.service.as_deref(), 1, 50)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ClosestProvider {
    #[serde(flatten)]
    pub service_provider: ServiceProvider,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BalanceResponse {
    pub balance: f64,
    pub amount_to_pay: f64,
    pub percent_to_pay: f64,
}

impl From<&ServiceProvider> for BalanceResponse {
    fn from(sp: &ServiceProvider) -> Self {
        Self {
            balance: sp.balance,
            amount_to_pay: sp.amount_to_pay,
            percent_to_pay: sp.percent_to_pay,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetStateRequest {
    pub state: SpState,
}

impl Validate for SetStateRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetServicesRequest {
    pub services: Vec<String>,
}

impl Validate for SetServicesRequest {
    fn validate(&self) -> Result<(), ApiError> {
        for service in &self.services {
            validation::length("services", service, 1, 50)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetPercentToPayRequest {
    #[serde(alias = "percentToPay", alias = "PercentToPay")]
    pub percent_to_pay: f64,
}

impl Validate for SetPercentToPayRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::range("percent_to_pay", self.percent_to_pay, 0.0, 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddPaymentRequest {
    pub amount: f64,
    pub date: Option<DateTime<Utc>>,
}

impl Validate for AddPaymentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validation::positive("amount", self.amount)
    }
}

/// Query filter for the admin listing (`GET /serviceProviders?status=...`).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProviderFilter {
    pub status: Option<SpStatus>,
}

/// Query filter for clients browsing available providers.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AvailabilityFilter {
    pub service: Option<String>,
    pub wilaya: Option<String>,
}

impl AvailabilityFilter {
    pub fn matches(&self, sp: &ServiceProvider) -> bool {
        sp.is_available()
            && self.service.as_deref().is_none_or(|s| sp.offers(s))
            && self.wilaya.as_deref().is_none_or(|w| sp.wilaya == w)
    }
}
