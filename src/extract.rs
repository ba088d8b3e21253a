//! Request extractors for path ids, query strings and validated JSON bodies.
//!
//! All of them reject with `ApiError`, so a malformed id or body produces the same
//! `{"error": ...}` shape as every other failure.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{errors::ApiError, validation::Validate};

/// ObjectId
///
/// A path id that must parse as a UUID; anything else is `400 Invalid ID.`. Use a tuple
/// (`ObjectId<(Uuid, Uuid)>`) for routes with two ids.
#[derive(Debug, Clone, Copy)]
pub struct ObjectId<T = Uuid>(pub T);

impl<S, T> FromRequestParts<S> for ObjectId<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| ObjectId(id))
            .map_err(|_| ApiError::InvalidId)
    }
}

/// ApiQuery
///
/// `Query<T>` whose rejection (unknown enum value, mistyped number) is a `400` with the
/// usual error body.
#[derive(Debug, Clone, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))
    }
}

/// ValidatedJson
///
/// A JSON body that decoded and passed `Validate`. Decoding failures (bad JSON, missing
/// or mistyped fields) and validation failures are both `400`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    impl Validate for Named {
        fn validate(&self) -> Result<(), ApiError> {
            crate::validation::length("name", &self.name, 2, 50)
        }
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn rejects_bodies_that_fail_validation() {
        let err = ValidatedJson::<Named>::from_request(json_request(r#"{"name":"a"}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let ok = ValidatedJson::<Named>::from_request(json_request(r#"{"name":"ab"}"#), &()).await;
        assert_eq!(ok.unwrap().0.name, "ab");
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Colour {
        Red,
    }

    #[derive(Debug, Deserialize)]
    struct Filter {
        colour: Option<Colour>,
    }

    fn query_parts(uri: &str) -> Parts {
        let (parts, _) = HttpRequest::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn query_rejections_are_validation_errors() {
        let mut parts = query_parts("/?colour=blue");
        let err = ApiQuery::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut parts = query_parts("/?colour=red");
        let ApiQuery(filter) = ApiQuery::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(matches!(filter.colour, Some(Colour::Red)));

        let mut parts = query_parts("/");
        let ApiQuery(filter) = ApiQuery::<Filter>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(filter.colour.is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let err = ValidatedJson::<Named>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
