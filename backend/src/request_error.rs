//! Outcome classes of a failed endpoint call.

/// Why an endpoint call produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The caller superseded or cancelled the call. Never shown to the user.
    Aborted,
    /// The server refused access (HTTP 403). Carries the server's explanation, rendered as-is.
    AccessDenied(String),
    /// Network or server error with a short reason.
    TransportFailure(String),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted => write!(f, "request aborted"),
            Self::AccessDenied(explanation) => write!(f, "access denied: {}", explanation),
            Self::TransportFailure(reason) => write!(f, "request failed: {}", reason),
        }
    }
}

impl std::error::Error for RequestError {}
