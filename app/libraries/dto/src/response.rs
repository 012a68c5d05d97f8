use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use convert_case::{Case, Casing};
use validator::ValidationErrors;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Operation successful";

/// Outcome code carried by every envelope; serialized as its HTTP number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success = 200,
    Created = 201,
    NoContent = 204,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl ResponseCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn status(self) -> StatusCode {
        StatusCode::from_u16(self.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl TryFrom<u16> for ResponseCode {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            200 => Self::Success,
            201 => Self::Created,
            204 => Self::NoContent,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            500 => Self::InternalServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            other => return Err(other),
        })
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u16(self.as_u16())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(d)?;
        ResponseCode::try_from(code)
            .map_err(|code| D::Error::custom(format!("unknown response code {code}")))
    }
}

/// Uniform success/error wrapper returned by every service operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub response_code: ResponseCode,
    pub is_success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            response_code: ResponseCode::Success,
            is_success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
            trace_id: None,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::success(data, DEFAULT_SUCCESS_MESSAGE)
    }

    pub fn error(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            response_code: code,
            is_success: false,
            message: message.into(),
            data: None,
            errors: None,
            trace_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(ResponseCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(ResponseCode::NotFound, message)
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn traced(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.response_code.status(), Json(self)).into_response()
    }
}

/// Flattens field errors into `"field: message"` lines, sorted by field.
/// Fields carry their camelCase wire names.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, failures)| {
            let field = field.to_case(Case::Camel);
            failures.iter().map(move |failure| match &failure.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: invalid value ({})", failure.code),
            })
        })
        .collect();
    messages.sort();
    messages
}
