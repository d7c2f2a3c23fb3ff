//! `Authorization` header parsing.

use std::fmt;

use axum::http::header::{InvalidHeaderValue, AUTHORIZATION};
use axum::http::{HeaderMap, HeaderValue};

use crate::auth::AuthError;

/// The only scheme the gate accepts.
pub const BEARER: &str = "Bearer";

/// Scheme and credential taken from an `Authorization` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Authentication {
    pub scheme: String,
    pub credential: String,
}

impl Authentication {
    /// Split a header value on spaces.
    ///
    /// One token is a bare credential; with two or more, the first two are
    /// the scheme and the credential and the rest is ignored.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        if header.is_empty() {
            return Err(AuthError::NoCredential);
        }
        let mut tokens = header.split(' ');
        let first = tokens.next().unwrap_or_default();
        let authentication = match tokens.next() {
            Some(second) => Self {
                scheme: first.to_string(),
                credential: second.to_string(),
            },
            None => Self {
                scheme: String::new(),
                credential: first.to_string(),
            },
        };
        if authentication.credential.is_empty() {
            return Err(AuthError::NoCredential);
        }
        Ok(authentication)
    }

    /// Extract a bearer credential from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let raw = match headers.get(AUTHORIZATION) {
            Some(value) => value.to_str().map_err(|_| AuthError::UnsupportedScheme)?,
            None => return Err(AuthError::NoCredential),
        };
        let authentication = Self::parse(raw)?;
        if authentication.scheme != BEARER {
            return Err(AuthError::UnsupportedScheme);
        }
        Ok(authentication)
    }

    /// Render back into an `Authorization` header value.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }

    /// A header map carrying only this `Authorization` value.
    pub fn headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.header_value()?);
        Ok(headers)
    }
}

impl fmt::Display for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_empty() {
            f.write_str(&self.credential)
        } else {
            write!(f, "{} {}", self.scheme, self.credential)
        }
    }
}
