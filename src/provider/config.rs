//! Provider configuration: schema, validation and resolution into client options.
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{ClientOptions, Credentials};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Default access management host.
pub const DEFAULT_HOST: &str = "http://localhost:8080/openam";
/// Default administrative user.
pub const DEFAULT_USERNAME: &str = "amadmin";
/// Default administrative password.
pub const DEFAULT_PASSWORD: &str = "p4ssw0rd";
/// Default realm.
pub const DEFAULT_REALM: &str = "/";
/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;

/// Looks up environment variables; injectable so tests need not touch the process env.
pub type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Read a variable from the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// The provider configuration block as written by the user.
///
/// Every attribute is optional; unset attributes fall back to environment
/// variables and then to defaults when resolved.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Access management base URL, including the deployment context.
    pub host: Option<String>,
    /// Administrative user for session login.
    pub username: Option<String>,
    /// Password of the administrative user.
    pub password: Option<String>,
    /// Realm holding the managed configuration.
    pub realm: Option<String>,
    /// Bearer token used instead of session login.
    pub access_token: Option<String>,
    /// Identity management base URL.
    pub idm_host: Option<String>,
    /// Session cookie name.
    pub cookie_name: Option<String>,
    /// Request timeout in seconds.
    pub timeout: Option<i64>,
}

impl ProviderConfig {
    /// Decode the configuration, `null` meaning an empty block.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description(
                "Manage ForgeRock/PingAM and PingOne Advanced Identity Cloud configuration.",
            )
            .with_attribute(
                "host",
                Attribute::optional_string()
                    .with_description(
                        "FRAM Host to connect as, must include the application context i.e \
                         `https://internal.example.com/openam`.<BR>The default is \
                         `http://localhost:8080/openam`. \
                         Can also be set with `FRAM_HOST` or `FRAM_BASEURL`.",
                    )
                    .with_default(json!(DEFAULT_HOST)),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description("FRAM username to connect as.<BR>The default is `amadmin`")
                    .with_default(json!(DEFAULT_USERNAME)),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .with_description(
                        "FRAM Password of username to connect as.<BR>The default is `p4ssw0rd`",
                    )
                    .with_default(json!(DEFAULT_PASSWORD))
                    .sensitive(),
            )
            .with_attribute(
                "realm",
                Attribute::optional_string()
                    .with_description("FRAM realm to use i.e `/root`.<BR>The default is `/`")
                    .with_default(json!(DEFAULT_REALM)),
            )
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .with_description(
                        "OAuth2 access token sent as a bearer token instead of logging in \
                         with username and password.",
                    )
                    .sensitive(),
            )
            .with_attribute(
                "idm_host",
                Attribute::optional_string().with_description(
                    "Identity management host, defaults to `/openidm/` on the host's origin.",
                ),
            )
            .with_attribute(
                "cookie_name",
                Attribute::optional_string()
                    .with_description("Name of the session cookie.")
                    .with_default(json!(crate::client::DEFAULT_COOKIE_NAME)),
            )
            .with_attribute(
                "timeout",
                Attribute::optional_int64()
                    .with_description("Request timeout in seconds.")
                    .with_default(json!(DEFAULT_TIMEOUT_SECS)),
            )
    }

    /// Checks beyond the schema on explicitly configured values.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (name, value) in [("host", &self.host), ("idm_host", &self.idm_host)] {
            let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            if let Err(error) = ClientOptions::host(value).client() {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid {}", name))
                        .with_detail(format!("Expected an http(s) URL: {}", error))
                        .with_attribute(name),
                );
            }
        }
        if let Some(timeout) = self.timeout {
            if timeout <= 0 {
                diagnostics.push(
                    Diagnostic::error("Invalid timeout")
                        .with_detail(format!(
                            "Timeout must be a positive number of seconds, got {}",
                            timeout
                        ))
                        .with_attribute("timeout"),
                );
            }
        }
        if is_set(&self.access_token) && is_set(&self.username) {
            diagnostics.push(
                Diagnostic::warning("Conflicting credentials")
                    .with_detail("access_token is set, username and password will be ignored")
                    .with_attribute("username"),
            );
        }
        diagnostics
    }

    /// Fill unset values from the environment and defaults.
    pub fn resolve(&self, env: &EnvLookup) -> Result<ClientOptions, ProviderError> {
        let host = pick(&self.host, env, &["FRAM_HOST", "FRAM_BASEURL"])
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let realm =
            pick(&self.realm, env, &["FRAM_REALM"]).unwrap_or_else(|| DEFAULT_REALM.to_string());
        let credentials = match pick(&self.access_token, env, &["FRAM_ACCESS_TOKEN"]) {
            Some(token) => Credentials::AccessToken(token),
            None => Credentials::Session {
                username: pick(&self.username, env, &["FRAM_USERNAME"])
                    .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
                password: pick(&self.password, env, &["FRAM_PASSWORD"])
                    .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            },
        };
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout <= 0 {
            return Err(ProviderError::InvalidConfiguration(format!(
                "timeout must be positive, got {}",
                timeout
            )));
        }

        let mut builder = ClientOptions::host(host)
            .realm(realm)
            .credentials(credentials)
            .timeout(Duration::from_secs(timeout as u64));
        if let Some(idm_host) = pick(&self.idm_host, env, &["FRAM_IDM_HOST"]) {
            builder = builder.idm_host(idm_host);
        }
        if let Some(cookie_name) = pick(&self.cookie_name, env, &["FRAM_COOKIE_NAME"]) {
            builder = builder.cookie_name(cookie_name);
        }
        builder.client().map_err(|error| {
            ProviderError::InvalidConfiguration(format!("Unable to create client: {}", error))
        })
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.is_empty())
}

/// The configured value if set, else the first non-empty environment variable.
fn pick(value: &Option<String>, env: &EnvLookup, keys: &[&str]) -> Option<String> {
    if is_set(value) {
        return value.clone();
    }
    keys.iter()
        .filter_map(|key| env(key))
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_config_or_env() {
        let options = ProviderConfig::default().resolve(&env(&[])).unwrap();
        assert_eq!(options.host.as_str(), "http://localhost:8080/openam/");
        assert_eq!(options.idm_host.as_str(), "http://localhost:8080/openidm/");
        assert_eq!(options.realm, "/");
        assert_eq!(
            options.credentials,
            Credentials::Session {
                username: "amadmin".into(),
                password: "p4ssw0rd".into(),
            }
        );
        assert_eq!(options.timeout, Duration::from_secs(30));
    }

    #[test]
    fn env_fills_unset_values() {
        let env = env(&[
            ("FRAM_BASEURL", "https://legacy.example.com/am"),
            ("FRAM_USERNAME", "admin"),
            ("FRAM_PASSWORD", "secret"),
            ("FRAM_REALM", "/alpha"),
        ]);
        let options = ProviderConfig::default().resolve(&env).unwrap();
        assert_eq!(options.host.as_str(), "https://legacy.example.com/am/");
        assert_eq!(options.realm, "/alpha");
        assert_eq!(
            options.credentials,
            Credentials::Session {
                username: "admin".into(),
                password: "secret".into(),
            }
        );
    }

    #[test]
    fn config_wins_over_env() {
        let env = env(&[
            ("FRAM_HOST", "https://env.example.com/am"),
            ("FRAM_BASEURL", "https://legacy.example.com/am"),
        ]);
        let config = ProviderConfig {
            host: Some("https://config.example.com/am".into()),
            ..Default::default()
        };
        let options = config.resolve(&env).unwrap();
        assert_eq!(options.host.as_str(), "https://config.example.com/am/");

        let options = ProviderConfig::default().resolve(&env).unwrap();
        assert_eq!(options.host.as_str(), "https://env.example.com/am/");
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let config = ProviderConfig {
            host: Some(String::new()),
            ..Default::default()
        };
        let options = config
            .resolve(&env(&[("FRAM_HOST", "https://env.example.com/am")]))
            .unwrap();
        assert_eq!(options.host.as_str(), "https://env.example.com/am/");
    }

    #[test]
    fn access_token_selects_bearer_credentials() {
        let options = ProviderConfig::default()
            .resolve(&env(&[("FRAM_ACCESS_TOKEN", "eyJ0")]))
            .unwrap();
        assert_eq!(options.credentials, Credentials::AccessToken("eyJ0".into()));
    }

    #[test]
    fn invalid_env_host_fails_resolution() {
        let error = ProviderConfig::default()
            .resolve(&env(&[("FRAM_HOST", "localhost:8080")]))
            .unwrap_err();
        assert!(matches!(error, ProviderError::InvalidConfiguration(_)));
        assert_eq!(error.summary(), "Invalid Provider Configuration");
    }

    #[test]
    fn non_positive_timeout_fails_resolution() {
        let config = ProviderConfig {
            timeout: Some(-5),
            ..Default::default()
        };
        let error = config.resolve(&env(&[])).unwrap_err();
        assert!(matches!(error, ProviderError::InvalidConfiguration(_)));
        assert_eq!(
            error.to_string(),
            "Invalid provider configuration: timeout must be positive, got -5"
        );
    }

    #[test]
    fn validation_checks_explicit_values() {
        let config = ProviderConfig {
            host: Some("not a url".into()),
            timeout: Some(0),
            access_token: Some("token".into()),
            username: Some("amadmin".into()),
            ..Default::default()
        };
        let diagnostics = config.validate();
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("host"));
        assert_eq!(diagnostics[1].attribute.as_deref(), Some("timeout"));
        assert!(!diagnostics[2].is_error());

        assert!(ProviderConfig::default().validate().is_empty());
    }

    #[test]
    fn from_value_accepts_null_and_objects() {
        assert_eq!(
            ProviderConfig::from_value(&Value::Null).unwrap(),
            ProviderConfig::default()
        );
        let value = json!({"realm": "/alpha", "timeout": 10});
        let config = ProviderConfig::from_value(&value).unwrap();
        assert_eq!(config.realm.as_deref(), Some("/alpha"));
        assert_eq!(config.timeout, Some(10));
        assert!(ProviderConfig::from_value(&json!({"timeout": "ten"})).is_err());
    }

    #[test]
    fn schema_matches_config_fields() {
        let schema = ProviderConfig::schema();
        assert!(schema.attribute("password").unwrap().flags.sensitive);
        assert!(schema.attribute("access_token").unwrap().flags.sensitive);
        let value = json!({"host": "http://am", "timeout": 5});
        assert!(validate(&schema, &value).is_empty());
        assert_eq!(validate(&schema, &json!({"hostname": "x"})).len(), 1);
    }
}
