use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Error payload the bastion API attaches to failed requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    pub description: String,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}: {}", self.error, self.description)
        }
    }
}

/// What came back with a non-success status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusBody {
    Structured(ApiErrorBody),
    Raw(String),
}

impl StatusBody {
    pub(crate) fn parse(body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(structured) => Self::Structured(structured),
            Err(_) => Self::Raw(body.to_string()),
        }
    }
}

impl fmt::Display for StatusBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(body) => write!(f, "api error response: {body}"),
            Self::Raw(text) => write!(f, "plain text response: {text}"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("cannot do request to Wallix bastion {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response http status not ok from {url}: {status}, {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: StatusBody,
    },
    #[error("cannot decode response from {url} as json {expected}: {source}: {body}")]
    Decode {
        url: String,
        expected: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("authentication to {url} answered {status} instead of 204 No Content")]
    Unauthenticated { url: String, status: StatusCode },
    #[error("cannot build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("cannot look {minutes} minutes back for closed sessions, the date is out of range")]
    WindowOutOfRange { minutes: i64 },
}

impl ApiError {
    /// The HTTP status of the failed response, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::Unauthenticated { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structured_body_is_recognised() {
        let body = StatusBody::parse(r#"{"error": "Forbidden", "description": "invalid credentials"}"#);
        assert_eq!(
            body,
            StatusBody::Structured(ApiErrorBody {
                error: "Forbidden".to_string(),
                description: "invalid credentials".to_string(),
            })
        );
        assert_eq!(body.to_string(), "api error response: Forbidden: invalid credentials");
    }

    #[test]
    fn anything_else_stays_raw() {
        let body = StatusBody::parse("<html>bad gateway</html>");
        assert_eq!(body, StatusBody::Raw("<html>bad gateway</html>".to_string()));
        assert_eq!(body.to_string(), "plain text response: <html>bad gateway</html>");
    }
}
