//! JSON models of the identity platform objects managed by the provider.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of the singleton Base URL Source service.
pub const BASE_URL_SOURCE_ID: &str = "baseurl";

/// Configuration of the Base URL Source service of a realm.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUrlSource {
    /// How the base URL is derived, see [`BaseUrlSourceKind`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,

    /// Context path appended to the calculated base URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub context_path: String,

    /// Base URL used with [`BaseUrlSourceKind::FixedValue`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub fixed_value: String,

    /// Provider class used with [`BaseUrlSourceKind::ExtensionClass`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub extension_class_name: String,
}

/// Supported values for [`BaseUrlSource::source`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseUrlSourceKind {
    /// An extension class computes the base URL from the request.
    ExtensionClass,
    /// A fixed base URL.
    FixedValue,
    /// The RFC 7239 `Forwarded` header.
    ForwardedHeader,
    /// Host and protocol of the incoming request.
    RequestValues,
    /// The non-standard `X-Forwarded-*` headers.
    XForwardedHeaders,
}

impl BaseUrlSourceKind {
    /// Every supported source, in documentation order.
    pub const ALL: [BaseUrlSourceKind; 5] = [
        BaseUrlSourceKind::ExtensionClass,
        BaseUrlSourceKind::FixedValue,
        BaseUrlSourceKind::ForwardedHeader,
        BaseUrlSourceKind::RequestValues,
        BaseUrlSourceKind::XForwardedHeaders,
    ];

    /// Value of the source as used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtensionClass => "EXTENSION_CLASS",
            Self::FixedValue => "FIXED_VALUE",
            Self::ForwardedHeader => "FORWARDED_HEADER",
            Self::RequestValues => "REQUEST_VALUES",
            Self::XForwardedHeaders => "X_FORWARDED_HEADERS",
        }
    }

    /// API values of every supported source.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(BaseUrlSourceKind::as_str).collect()
    }
}

impl fmt::Display for BaseUrlSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported Base URL source.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unsupported base URL source '{0}'")]
pub struct UnknownBaseUrlSource(pub String);

impl FromStr for BaseUrlSourceKind {
    type Err = UnknownBaseUrlSource;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownBaseUrlSource(value.to_string()))
    }
}

/// A service account stored in the platform's managed objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    /// Identifier assigned by the platform.
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,

    /// Display name of the account.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Free-form description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// OAuth2 scopes granted to the account.
    #[serde(default, deserialize_with = "null_as_default")]
    pub scopes: Vec<String>,

    /// `Active` or `Inactive`.
    #[serde(
        rename = "accountStatus",
        default,
        deserialize_with = "null_as_default"
    )]
    pub account_status: String,

    /// JSON Web Key Set, as a JSON encoded string.
    #[serde(default, deserialize_with = "jwks_as_string")]
    pub jwks: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn jwks_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let jwks = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(jwks)) => jwks,
        Some(other) => other.to_string(),
    };
    Ok(jwks)
}
