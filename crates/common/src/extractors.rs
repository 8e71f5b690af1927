//! Custom axum extractors for Easel

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{Error, FieldErrors};

/// JSON extractor that validates the deserialized value automatically.
///
/// Replaces `Json<T>` + manual `.validate()` calls in handlers.
/// Requires `T: DeserializeOwned + Validate`.
///
/// All input errors (deserialization + validation) return 400; validation
/// failures carry per-field messages.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

/// Rejection type for `ValidatedJson`:
/// - Oversized bodies → 413
/// - JSON deserialization errors → 400 (via `Error::Validation`)
/// - Validation errors → 400 (via `Error::Fields`)
#[derive(Debug)]
pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Validation(Error),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            ValidatedJsonRejection::Json(e) => {
                let status = e.status();
                if status == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                    (status, e.body_text()).into_response()
                } else {
                    Error::Validation(e.body_text()).into_response()
                }
            }
            ValidatedJsonRejection::Validation(e) => e.into_response(),
        }
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;
        value.validate().map_err(|e| {
            ValidatedJsonRejection::Validation(Error::Fields(FieldErrors::from(e)))
        })?;
        Ok(ValidatedJson(value))
    }
}

/// Message for a path id that cannot name any row
pub const UNKNOWN_RESOURCE: &str = "Not found.";

/// Path extractor for resource ids.
///
/// A segment that does not deserialize (`/projects/abc/`) cannot match a
/// stored row, so it is answered like a missing one: 404 with the JSON
/// error body instead of axum's plain-text 400.
#[derive(Debug)]
pub struct ResourcePath<T>(pub T);

impl<T, S> FromRequestParts<S> for ResourcePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ResourcePath(value)),
            Err(rejection) => {
                tracing::debug!(path = %parts.uri.path(), error = %rejection, "Unresolvable path id");
                Err(Error::NotFound(UNKNOWN_RESOURCE.to_string()))
            }
        }
    }
}

/// A file part of a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client supplied filename, if any
    pub file_name: Option<String>,
    /// Client supplied content type, if any
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Fully buffered `multipart/form-data` body.
///
/// Parts with a filename are collected as files, all other parts as text.
/// A repeated field name keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    text: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.insert(name.into(), value.into());
        self
    }

    /// Add a file field
    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    /// Text value of a field, treating blank values as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Raw text value of a field, blank values included
    pub fn raw_text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    pub fn has_text(&self, name: &str) -> bool {
        self.text.contains_key(name)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Take ownership of a file field
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Whether a field was submitted at all, as text or as file
    pub fn contains(&self, name: &str) -> bool {
        self.text.contains_key(name) || self.files.contains_key(name)
    }

    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = MultipartForm::new();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name: Some(file_name),
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = field.text().await?;
                    form.text.insert(name, value);
                }
            }
        }
        Ok(form)
    }
}

/// Rejection type for `MultipartForm`, always 400 unless the body was too large
#[derive(Debug)]
pub enum MultipartFormRejection {
    Multipart(MultipartRejection),
    Body(MultipartError),
}

impl IntoResponse for MultipartFormRejection {
    fn into_response(self) -> Response {
        match self {
            MultipartFormRejection::Multipart(e) => {
                Error::Validation(e.body_text()).into_response()
            }
            MultipartFormRejection::Body(e) => {
                let status = e.status();
                if status == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                    (status, e.body_text()).into_response()
                } else {
                    Error::Validation(e.body_text()).into_response()
                }
            }
        }
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = MultipartFormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(MultipartFormRejection::Multipart)?;
        MultipartForm::read(multipart)
            .await
            .map_err(MultipartFormRejection::Body)
    }
}
