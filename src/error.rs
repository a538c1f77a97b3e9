use std::any::Any;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

/// An exchange that failed while a request handler was running.
///
/// Produced when a handler panics; the server stays up and only this one
/// request receives the error handler's response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Request handler failed: {message}")]
pub struct ExchangeError {
    pub message: String,
}

impl ExchangeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extract a readable message from a panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self { message }
    }
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;

        // The panic message stays out of the body
        let body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Error {}</title>
</head>
<body>
    <h1>Error {}</h1>
    <p>Internal server error</p>
</body>
</html>"#,
            status.as_u16(),
            status.as_u16(),
        );

        (status, Html(body)).into_response()
    }
}

/// Error handler used when the caller does not supply one.
pub fn default_error_handler(error: ExchangeError) -> Response {
    error.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panic_str() {
        let err = ExchangeError::from_panic(Box::new("boom"));
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_from_panic_string() {
        let err = ExchangeError::from_panic(Box::new(format!("boom {}", 42)));
        assert_eq!(err.message, "boom 42");
    }

    #[test]
    fn test_from_panic_other_payload() {
        let err = ExchangeError::from_panic(Box::new(17u32));
        assert_eq!(err.message, "unknown panic");
    }

    #[test]
    fn test_default_error_handler_is_500() {
        let response = default_error_handler(ExchangeError::new("secret detail"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
