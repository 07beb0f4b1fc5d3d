//! The `fram_p1aic_serviceaccount` resource and data source.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{string_attr, DataSource, ManagedResource};
use crate::client::{ClientError, IdentityApi, ServiceAccount};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::one_of;

const TYPE_NAME: &str = "fram_p1aic_serviceaccount";

const ACCOUNT_STATUSES: [&str; 2] = ["Active", "Inactive"];

/// Terraform state of a service account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ServiceAccountModel {
    #[serde(default)]
    id: Option<String>,
    name: String,
    description: String,
    scopes: Vec<String>,
    account_status: String,
    jwks: String,
}

impl ServiceAccountModel {
    fn from_state(state: &Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    fn into_state(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    fn to_api(&self) -> ServiceAccount {
        ServiceAccount {
            id: String::new(),
            name: self.name.clone(),
            description: self.description.clone(),
            scopes: self.scopes.clone(),
            account_status: self.account_status.clone(),
            jwks: self.jwks.clone(),
        }
    }

    fn from_api(account: ServiceAccount) -> Self {
        Self {
            id: Some(account.id).filter(|id| !id.is_empty()),
            name: account.name,
            description: account.description,
            scopes: account.scopes,
            account_status: account.account_status,
            jwks: account.jwks,
        }
    }

    /// Keep the prior spelling of values the platform normalizes.
    ///
    /// Scopes come back in the platform's order and the key set is
    /// re-encoded, so equal sets and equal JSON documents keep the prior text.
    fn reconcile(mut self, prior: &Value) -> Self {
        if let Some(Value::Array(scopes)) = prior.get("scopes") {
            let prior_scopes: Vec<String> = scopes
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            if same_set(&prior_scopes, &self.scopes) {
                self.scopes = prior_scopes;
            }
        }
        if let Some(prior_jwks) = string_attr(prior, "jwks") {
            if same_json(&prior_jwks, &self.jwks) {
                self.jwks = prior_jwks;
            }
        }
        self
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

fn same_json(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Id of the service account a state or configuration refers to.
fn account_id(value: &Value) -> Result<String, ProviderError> {
    string_attr(value, "id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Validation("service account id is not set".to_string()))
}

fn validate_scopes(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(Value::Array(scopes)) = config.get("scopes") else {
        return;
    };
    if scopes.is_empty() {
        diagnostics.push(
            Diagnostic::error("Missing scopes")
                .with_detail("A service account needs at least one scope")
                .with_attribute("scopes"),
        );
        return;
    }
    let mut seen = BTreeSet::new();
    for scope in scopes.iter().filter_map(Value::as_str) {
        if scope.trim().is_empty() {
            diagnostics.push(
                Diagnostic::error("Invalid scope")
                    .with_detail("Scopes must not be blank")
                    .with_attribute("scopes"),
            );
        } else if !seen.insert(scope) {
            diagnostics.push(
                Diagnostic::error("Duplicate scope")
                    .with_detail(format!("Scope '{}' is listed more than once", scope))
                    .with_attribute("scopes"),
            );
        }
    }
}

fn validate_jwks(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(jwks) = config.get("jwks").and_then(Value::as_str) else {
        return;
    };
    let problem = match serde_json::from_str::<Value>(jwks) {
        Err(error) => Some(format!("jwks is not valid JSON: {}", error)),
        Ok(Value::Object(set)) => match set.get("keys") {
            Some(Value::Array(_)) => None,
            _ => Some("jwks must contain a \"keys\" array".to_string()),
        },
        Ok(_) => Some("jwks must be a JSON object".to_string()),
    };
    if let Some(detail) = problem {
        diagnostics.push(
            Diagnostic::error("Invalid JSON Web Key Set")
                .with_detail(detail)
                .with_attribute("jwks"),
        );
    }
}

/// Manages service accounts of the identity cloud.
pub struct ServiceAccountResource;

#[async_trait::async_trait]
impl ManagedResource for ServiceAccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("PingOne Advanced Identity Cloud Service Account")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Identifier of the service account."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the service account."),
            )
            .with_attribute(
                "description",
                Attribute::required_string()
                    .with_description("Description of the service account."),
            )
            .with_attribute(
                "scopes",
                Attribute::required_string_list()
                    .with_description("Scopes granted to the service account, e.g. `fr:am:*`."),
            )
            .with_attribute(
                "account_status",
                Attribute::required_string()
                    .with_description("Status of the account: `Active` or `Inactive`."),
            )
            .with_attribute(
                "jwks",
                Attribute::required_string().with_description(
                    "JSON Web Key Set holding the public keys the account signs assertions with.",
                ),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(name) = config.get("name").and_then(Value::as_str) {
            if name.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error("Invalid name")
                        .with_detail("name must not be blank")
                        .with_attribute("name"),
                );
            }
        }
        diagnostics.extend(one_of(config, "account_status", &ACCOUNT_STATUSES));
        validate_scopes(config, &mut diagnostics);
        validate_jwks(config, &mut diagnostics);
        diagnostics
    }

    async fn create(&self, api: &dyn IdentityApi, planned: &Value) -> Result<Value, ProviderError> {
        let model = ServiceAccountModel::from_state(planned)?;
        let created = api
            .create_service_account(&model.to_api())
            .await
            .map_err(|error| ProviderError::client("Unable to create service account", error))?;
        if created.id.is_empty() {
            return Err(ProviderError::client(
                "Unable to create service account",
                ClientError::InvalidResponse {
                    reason: "no _id in response".to_string(),
                    body: String::new(),
                },
            ));
        }
        info!(id = %created.id, "Created service account");
        ServiceAccountModel {
            id: Some(created.id),
            ..model
        }
        .into_state()
    }

    async fn read(&self, api: &dyn IdentityApi, current: &Value) -> Result<Value, ProviderError> {
        let id = account_id(current)?;
        match api.read_service_account(&id).await {
            Ok(account) => {
                let mut model = ServiceAccountModel::from_api(account).reconcile(current);
                model.id.get_or_insert(id);
                model.into_state()
            }
            Err(error) if error.is_not_found() => {
                warn!(%id, "Service account not found, removing it from state");
                Ok(Value::Null)
            }
            Err(error) => Err(ProviderError::client("Unable to read service account", error)),
        }
    }

    async fn update(
        &self,
        api: &dyn IdentityApi,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = account_id(prior)?;
        let model = ServiceAccountModel::from_state(planned)?;
        api.update_service_account(&id, &model.to_api())
            .await
            .map_err(|error| ProviderError::client("Unable to update service account", error))?;
        ServiceAccountModel {
            id: Some(id),
            ..model
        }
        .into_state()
    }

    async fn delete(&self, api: &dyn IdentityApi, current: &Value) -> Result<(), ProviderError> {
        let id = account_id(current)?;
        match api.delete_service_account(&id).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => {
                debug!(%id, "Service account already deleted");
                Ok(())
            }
            Err(error) => Err(ProviderError::client("Unable to delete service account", error)),
        }
    }

    async fn import(&self, api: &dyn IdentityApi, id: &str) -> Result<Value, ProviderError> {
        match api.read_service_account(id).await {
            Ok(account) => {
                let mut model = ServiceAccountModel::from_api(account);
                model.id.get_or_insert_with(|| id.to_string());
                model.into_state()
            }
            Err(error) if error.is_not_found() => {
                Err(ProviderError::NotFound(format!("service account {}", id)))
            }
            Err(error) => Err(ProviderError::client("Unable to import service account", error)),
        }
    }
}

/// Reads a service account by id.
pub struct ServiceAccountDataSource;

#[async_trait::async_trait]
impl DataSource for ServiceAccountDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("PingOne Advanced Identity Cloud Service Account")
            .with_attribute(
                "id",
                Attribute::required_string().with_description("Identifier of the service account."),
            )
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("scopes", Attribute::computed_string_list())
            .with_attribute("account_status", Attribute::computed_string())
            .with_attribute("jwks", Attribute::computed_string())
    }

    async fn read(&self, api: &dyn IdentityApi, config: &Value) -> Result<Value, ProviderError> {
        let id = account_id(config)?;
        match api.read_service_account(&id).await {
            Ok(account) => {
                let mut model = ServiceAccountModel::from_api(account);
                model.id.get_or_insert(id);
                model.into_state()
            }
            Err(error) if error.is_not_found() => {
                Err(ProviderError::NotFound(format!("service account {}", id)))
            }
            Err(error) => Err(ProviderError::client("Unable to read service account", error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fixture;
    use crate::schema::has_errors;
    use serde_json::json;

    const JWKS: &str = r#"{"keys":[{"kty":"RSA","kid":"ci","e":"AQAB","n":"abc"}]}"#;

    fn config() -> Value {
        json!({
            "id": null,
            "name": "ci",
            "description": "Pipeline account",
            "scopes": ["fr:am:*", "fr:idm:*"],
            "account_status": "Active",
            "jwks": JWKS,
        })
    }

    fn account(id: &str) -> ServiceAccount {
        ServiceAccount {
            id: id.into(),
            name: "ci".into(),
            description: "Pipeline account".into(),
            scopes: vec!["fr:am:*".into(), "fr:idm:*".into()],
            account_status: "Active".into(),
            jwks: JWKS.into(),
        }
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(ServiceAccountResource.validate(&config()).is_empty());
    }

    #[test]
    fn test_validate_account_status() {
        let mut config = config();
        config["account_status"] = json!("active");
        let diagnostics = ServiceAccountResource.validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("account_status"));
    }

    #[test]
    fn test_validate_scopes() {
        let mut config = config();
        config["scopes"] = json!([]);
        assert!(has_errors(&ServiceAccountResource.validate(&config)));

        config["scopes"] = json!(["fr:am:*", " "]);
        let diagnostics = ServiceAccountResource.validate(&config);
        assert_eq!(diagnostics[0].summary, "Invalid scope");

        config["scopes"] = json!(["fr:am:*", "fr:am:*"]);
        let diagnostics = ServiceAccountResource.validate(&config);
        assert_eq!(diagnostics[0].summary, "Duplicate scope");
    }

    #[test]
    fn test_validate_jwks() {
        let mut config = config();
        for jwks in ["not json", "[]", r#"{"keys":{}}"#] {
            config["jwks"] = json!(jwks);
            let diagnostics = ServiceAccountResource.validate(&config);
            assert_eq!(diagnostics.len(), 1, "{}", jwks);
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("jwks"));
        }
    }

    #[test]
    fn test_validate_blank_name() {
        let mut config = config();
        config["name"] = json!("  ");
        let diagnostics = ServiceAccountResource.validate(&config);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn test_create_sets_id() {
        let client = fixture::Client::default();
        let state = ServiceAccountResource
            .create(&client, &config())
            .await
            .unwrap();
        assert_eq!(state["id"], "svcacct-1");
        assert_eq!(state["jwks"], JWKS);
        assert_eq!(client.service_account("svcacct-1").unwrap().name, "ci");
    }

    #[tokio::test]
    async fn test_read_keeps_prior_scope_order() {
        let client = fixture::Client::default();
        let mut remote = account("svc-1");
        remote.scopes.reverse();
        remote.jwks = serde_json::to_string_pretty(
            &serde_json::from_str::<Value>(JWKS).unwrap(),
        )
        .unwrap();
        client.insert_service_account(remote);

        let mut prior = config();
        prior["id"] = json!("svc-1");
        let state = ServiceAccountResource.read(&client, &prior).await.unwrap();
        assert_eq!(state, prior);
    }

    #[tokio::test]
    async fn test_read_reports_drift() {
        let client = fixture::Client::default();
        let mut remote = account("svc-1");
        remote.scopes = vec!["fr:am:*".into()];
        remote.account_status = "Inactive".into();
        client.insert_service_account(remote);

        let mut prior = config();
        prior["id"] = json!("svc-1");
        let state = ServiceAccountResource.read(&client, &prior).await.unwrap();
        assert_eq!(state["scopes"], json!(["fr:am:*"]));
        assert_eq!(state["account_status"], "Inactive");
    }

    #[tokio::test]
    async fn test_read_missing_is_null() {
        let client = fixture::Client::default();
        let mut prior = config();
        prior["id"] = json!("svc-1");
        let state = ServiceAccountResource.read(&client, &prior).await.unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_read_without_id() {
        let client = fixture::Client::default();
        let error = ServiceAccountResource
            .read(&client, &config())
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::Validation(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_uses_prior_id() {
        let client = fixture::Client::default();
        client.insert_service_account(account("svc-1"));

        let mut prior = config();
        prior["id"] = json!("svc-1");
        let mut planned = prior.clone();
        planned["description"] = json!("Rotated keys");
        let state = ServiceAccountResource
            .update(&client, &prior, &planned)
            .await
            .unwrap();
        assert_eq!(state["id"], "svc-1");
        assert_eq!(
            client.service_account("svc-1").unwrap().description,
            "Rotated keys"
        );
    }

    #[tokio::test]
    async fn test_update_missing_is_error() {
        let client = fixture::Client::default();
        let mut prior = config();
        prior["id"] = json!("svc-1");
        let error = ServiceAccountResource
            .update(&client, &prior, &prior)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ProviderError::Client {
                source: ClientError::NotFound(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let client = fixture::Client::default();
        client.insert_service_account(account("svc-1"));
        let mut state = config();
        state["id"] = json!("svc-1");

        tokio_test::assert_ok!(ServiceAccountResource.delete(&client, &state).await);
        assert!(client.service_account("svc-1").is_none());
        tokio_test::assert_ok!(ServiceAccountResource.delete(&client, &state).await);
    }

    #[tokio::test]
    async fn test_import() {
        let client = fixture::Client::default();
        client.insert_service_account(account("svc-1"));
        let state = ServiceAccountResource
            .import(&client, "svc-1")
            .await
            .unwrap();
        assert_eq!(state["id"], "svc-1");
        assert_eq!(state["scopes"], json!(["fr:am:*", "fr:idm:*"]));

        let error = ServiceAccountResource
            .import(&client, "svc-2")
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_data_source() {
        let client = fixture::Client::default();
        client.insert_service_account(account("svc-1"));
        let state = ServiceAccountDataSource
            .read(&client, &json!({"id": "svc-1"}))
            .await
            .unwrap();
        assert_eq!(state["name"], "ci");

        client.remove_service_account("svc-1");
        let error = ServiceAccountDataSource
            .read(&client, &json!({"id": "svc-1"}))
            .await
            .unwrap_err();
        assert_eq!(error.summary(), "Resource Not Found");
    }
}
