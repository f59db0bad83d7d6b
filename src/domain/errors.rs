use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error codes exposed across service boundaries.
///
/// Callers branch on the code, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Network,
    Timeout,
    UpstreamStatus,
    MalformedResponse,
    Persistence,
    InvalidInput,
}

impl ErrorCode {
    /// Default numeric status for the code, HTTP flavoured.
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorCode::Network => 503,
            ErrorCode::Timeout => 504,
            ErrorCode::UpstreamStatus => 502,
            ErrorCode::MalformedResponse => 502,
            ErrorCode::Persistence => 500,
            ErrorCode::InvalidInput => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Network => "NETWORK",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::UpstreamStatus => "UPSTREAM_STATUS",
            ErrorCode::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorCode::Persistence => "PERSISTENCE",
            ErrorCode::InvalidInput => "INVALID_INPUT",
        };
        write!(f, "{}", s)
    }
}

/// Normalized error shape for everything that crosses a component boundary
#[derive(Debug, Clone, Error, Serialize)]
#[error("[{code}/{status}] {message}")]
pub struct ServiceError {
    pub message: String,
    pub code: ErrorCode,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status: code.default_status(),
            details: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Non-2xx answer from an upstream service; keeps the upstream status.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamStatus, message).with_status(status)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedResponse, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Persistence, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::timeout(err.to_string())
        } else if err.is_decode() {
            ServiceError::malformed(err.to_string())
        } else if let Some(status) = err.status() {
            ServiceError::upstream(status.as_u16(), err.to_string())
        } else {
            ServiceError::network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for ServiceError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(inner) => inner.into(),
            reqwest_middleware::Error::Middleware(inner) => ServiceError::network(inner.to_string()),
        }
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::invalid_input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_keeps_status() {
        let err = ServiceError::upstream(429, "Too many requests");
        assert_eq!(err.code, ErrorCode::UpstreamStatus);
        assert_eq!(err.status, 429);
    }

    #[test]
    fn test_default_status_per_code() {
        assert_eq!(ServiceError::network("down").status, 503);
        assert_eq!(ServiceError::timeout("slow").status, 504);
        assert_eq!(ServiceError::malformed("bad json").status, 502);
        assert_eq!(ServiceError::invalid_input("bad csv").status, 400);
    }

    #[test]
    fn test_error_formatting() {
        let err = ServiceError::network("connection refused");
        let msg = err.to_string();
        assert!(msg.contains("NETWORK"));
        assert!(msg.contains("503"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_serialized_shape() {
        let err = ServiceError::persistence("disk full")
            .with_details(serde_json::json!({ "table": "predictions" }));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "PERSISTENCE");
        assert_eq!(json["status"], 500);
        assert_eq!(json["details"]["table"], "predictions");
    }
}
