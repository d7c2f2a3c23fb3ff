//! Resolved identity attached to authorized requests.

use axum::http::Extensions;
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::authentication::Authentication;

/// Identity returned by the login service, enriched with memberships.
///
/// Business lines and units are filled in after the token exchange and are
/// never part of the login service payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip)]
    pub authentication: Authentication,

    #[serde(rename = "userInfo", default, deserialize_with = "null_as_default")]
    pub info: Vec<Info>,

    #[serde(rename = "expTime", default, deserialize_with = "null_as_default")]
    pub expiry: i64,

    #[serde(rename = "chpRoles", default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,

    #[serde(skip)]
    pub business_lines: Vec<String>,

    #[serde(skip)]
    pub business_units: Vec<i64>,
}

/// Directory entry for the user, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "cn", default, deserialize_with = "null_as_default")]
    pub common_name: String,

    #[serde(rename = "sAMAccountName", default, deserialize_with = "null_as_default")]
    pub account_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub mail: String,

    #[serde(rename = "memberOf", default, deserialize_with = "null_as_default")]
    pub member_of: Vec<String>,
}

/// Upstream services encode empty collections as `null`; read those as
/// the empty value. Pair with `#[serde(default)]` for missing keys.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl User {
    /// The identity attached by the gate, or the zero `User` if none was.
    pub fn from_extensions(extensions: &Extensions) -> User {
        extensions.get::<User>().cloned().unwrap_or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Unit must match exactly; the line is compared case-insensitively.
    pub fn has_business_unit_and_line(&self, unit: i64, line: &str) -> bool {
        self.business_units.contains(&unit)
            && self
                .business_lines
                .iter()
                .any(|l| l.eq_ignore_ascii_case(line))
    }

    pub fn business_unit_codes(&self) -> Vec<String> {
        self.business_units.iter().map(i64::to_string).collect()
    }
}
