//! Multipart form handling for the upload routes.
//!
//! Every route declares which file fields it accepts and how many files each may carry.
//! Text parts are collected into a map for the model to parse; file parts are buffered
//! and checked against their rule before any of them reach storage.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};

use crate::{errors::ApiError, storage::StorageState};

pub const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// A file field accepted by a route.
#[derive(Debug, Clone, Copy)]
pub struct FileRule {
    pub name: &'static str,
    pub max_count: usize,
    pub image_only: bool,
}

impl FileRule {
    pub const fn image(name: &'static str) -> Self {
        Self {
            name,
            max_count: 1,
            image_only: true,
        }
    }

    pub const fn document(name: &'static str) -> Self {
        Self {
            name,
            max_count: 1,
            image_only: false,
        }
    }

    /// Any number of files of any type; the request body limit bounds the total.
    pub const fn documents(name: &'static str) -> Self {
        Self {
            name,
            max_count: usize::MAX,
            image_only: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The decoded multipart body: text fields by name, files grouped by field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    pub fn take_one(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).and_then(|files| files.into_iter().next())
    }

    pub fn take_all(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

/// MultipartBody
///
/// `Multipart` with its rejection (wrong content type) mapped onto `ApiError::Upload`.
/// The body is only read by `read_multipart`, so handlers can run their existence checks
/// first.
pub struct MultipartBody(pub Multipart);

impl<S> FromRequest<S> for MultipartBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(MultipartBody)
            .map_err(|rejection| ApiError::Upload(rejection.body_text()))
    }
}

pub fn is_image(content_type: &str) -> bool {
    IMAGE_TYPES.contains(&content_type)
}

/// Reads the whole multipart body, enforcing `rules` on every file part.
pub async fn read_multipart(
    MultipartBody(mut multipart): MultipartBody,
    rules: &[FileRule],
) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Upload(e.body_text()))?;
            form.fields.insert(name, value);
            continue;
        };

        let rule = rules
            .iter()
            .find(|rule| rule.name == name)
            .ok_or_else(|| ApiError::Upload(format!("Unexpected field: {name}")))?;

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if rule.image_only && !is_image(&content_type) {
            return Err(ApiError::Upload(format!(
                "\"{name}\" must be an image (jpeg, png or webp)."
            )));
        }

        let files = form.files.entry(name.clone()).or_default();
        if files.len() >= rule.max_count {
            return Err(ApiError::Upload(format!("Too many files for field: {name}")));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Upload(e.body_text()))?;
        files.push(UploadedFile {
            file_name: Some(file_name),
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(form)
}

/// Stores one uploaded file under a fresh key in `prefix` and returns the key.
pub async fn store_file(
    storage: &StorageState,
    prefix: &str,
    file: UploadedFile,
) -> Result<String, ApiError> {
    let key = crate::storage::object_key(prefix, file.file_name.as_deref());
    Ok(storage.put_object(&key, &file.content_type, file.bytes).await?)
}
