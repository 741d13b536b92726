use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// Body extractor that runs `validator` rules and rejects with the standard
/// error envelope. Form-encoded bodies are read as forms, everything else as JSON.
pub struct ValidatedBody<T>(pub T);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedBody<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            value
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            value
        };

        value.validate()?;
        Ok(ValidatedBody(value))
    }
}
