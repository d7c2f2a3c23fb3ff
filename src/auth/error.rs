//! Failure types produced while resolving an identity.

use serde::Deserialize;

/// Problems with the inbound `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Header missing or empty.
    #[error("no token")]
    NoCredential,

    /// Scheme other than `Bearer`.
    #[error("unsupported authentication")]
    UnsupportedScheme,
}

/// Uniform failure record for remote calls.
///
/// `code` is the upstream HTTP status, or 0 when no usable response exists
/// (transport, decode and parse failures). The struct doubles as the
/// `{"message": ...}` envelope returned by the reference-data service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct OutcomeError {
    #[serde(skip)]
    pub code: u16,

    #[serde(default, deserialize_with = "crate::auth::user::null_as_default")]
    pub message: String,
}

impl OutcomeError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure without an upstream status.
    pub fn local(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    pub fn has_status(&self) -> bool {
        self.code != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_message_only() {
        let err: OutcomeError =
            serde_json::from_str(r#"{"code": 9, "message": "not a member"}"#).unwrap();
        assert_eq!(err, OutcomeError::local("not a member"));
        assert!(!err.has_status());
        assert_eq!(err.to_string(), "not a member");

        let err: OutcomeError = serde_json::from_str(r#"{"message": null}"#).unwrap();
        assert_eq!(err, OutcomeError::local(""));
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(AuthError::NoCredential.to_string(), "no token");
        assert_eq!(
            AuthError::UnsupportedScheme.to_string(),
            "unsupported authentication"
        );
    }
}
