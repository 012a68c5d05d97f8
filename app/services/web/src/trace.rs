use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id assigned by the request-id layer, echoed in envelopes.
#[derive(Debug, Clone)]
pub struct TraceId(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for TraceId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Ok(TraceId(id))
    }
}
