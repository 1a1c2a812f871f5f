//! Validating JSON body extractor.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use galley_core::error::GalleyError;

use crate::dto::Validate;
use crate::error::ApiError;

/// A JSON body that parsed into `T` and passed [`Validate`].
///
/// The body is kept as received in `raw`; handlers fingerprint and forward
/// that, not the typed view.
#[derive(Debug)]
pub struct Validated<T> {
    /// Typed view of the body
    pub body: T,
    /// The body exactly as sent
    pub raw: Value,
}

#[async_trait]
impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        let body: T = serde_json::from_value(raw.clone())
            .map_err(|e| GalleyError::ValidationError(e.to_string()))?;
        body.validate().map_err(GalleyError::ValidationError)?;

        Ok(Self { body, raw })
    }
}
