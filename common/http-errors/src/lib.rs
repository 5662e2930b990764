use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Error fields the backend may put on a failed response. Different routes
/// use different keys, so all of them are optional.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ErrorBody {
    pub fn best_message(&self) -> Option<&str> {
        [&self.message, &self.error, &self.msg]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The backend understood the request and refused it (4xx).
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    /// Network failure or 5xx.
    #[error("backend unavailable: {message}")]
    Unavailable {
        status: Option<StatusCode>,
        message: String,
    },
    /// A success status with a body that could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Classify a non-success response using its status and raw body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.best_message().map(str::to_owned))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

        if status.is_server_error() {
            ApiError::Unavailable {
                status: Some(status),
                message,
            }
        } else {
            ApiError::Rejected { status, message }
        }
    }

    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Unavailable {
            status: None,
            message: err.to_string(),
        }
    }

    pub fn malformed<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Malformed(err.to_string())
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Unavailable { status, .. } => *status,
            ApiError::Malformed(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::Unavailable { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Pull the record list out of a list endpoint body. Accepts a bare array,
/// `{ "data": [..] }` and the paginated `{ "data": { "docs": [..] } }`.
pub fn extract_list(body: Value) -> ApiResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Object(mut page)) => match page.remove("docs") {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(ApiError::Malformed("data object has no docs array".into())),
            },
            Some(Value::Null) | None => {
                let envelope: ErrorBody =
                    serde_json::from_value(Value::Object(map)).unwrap_or_default();
                if envelope.success == Some(false) {
                    let message = envelope.best_message().unwrap_or(FALLBACK_MESSAGE);
                    Err(ApiError::Malformed(message.to_string()))
                } else {
                    Err(ApiError::Malformed("response has no data".into()))
                }
            }
            Some(other) => Err(ApiError::Malformed(format!(
                "unexpected data payload: {other}"
            ))),
        },
        other => Err(ApiError::Malformed(format!(
            "expected a list, got {other}"
        ))),
    }
}

/// Unwrap `{ "data": x }` when the backend wraps a single record.
pub fn extract_record(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}
