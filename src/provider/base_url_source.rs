//! The `fram_am_baseurlsource` resource and data source.
//!
//! The Base URL Source is a singleton service of a realm, so the resource id
//! is always [`BASE_URL_SOURCE_ID`] and create and update are both upserts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{DataSource, ManagedResource};
use crate::client::{BaseUrlSource, BaseUrlSourceKind, IdentityApi, BASE_URL_SOURCE_ID};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::PlanResult;
use crate::validation::one_of;

const TYPE_NAME: &str = "fram_am_baseurlsource";

const SOURCE_DESCRIPTION: &str = "Specifies the source of the base URL. \
Choose from the following:\n\n\
\t- Extension class. `EXTENSION_CLASS`\n\n\
\t\tSpecifies that the extension class returns a base URL from a provided `HttpServletRequest`. \
In the Extension class name field, enter org.forgerock.openam.services.baseurl.BaseURLProvider.\n\
\t- Fixed value. `FIXED_VALUE`\n\n\
\t\tSpecifies that the base URL is retrieved from a specific base URL value. \
In the Fixed value base URL field, enter the base URL value.\n\
\t- Forwarded header. `FORWARDED_HEADER`\n\n\
\t\tSpecifies that the base URL is retrieved from a forwarded header field in the HTTP request. \
The Forwarded HTTP header field is standardized and specified in \
[RFC7239](https://tools.ietf.org/html/rfc7239).\n\
\t- Host/protocol from incoming request. `REQUEST_VALUES`\n\n\
\t\tSpecifies that the hostname, server name, and port are retrieved \
from the incoming HTTP request.\n\
\t- X-Forwarded-* headers. `X_FORWARDED_HEADERS`\n\n\
\t\tSpecifies that the base URL is retrieved from non-standard header fields, such as \
`X-Forwarded-For`, `X-Forwarded-By`, and `X-Forwarded-Proto`.\n";

const CONTEXT_PATH_DESCRIPTION: &str = "Specifies the context path for the base URL. \
If provided, the base URL includes the deployment context path appended to the calculated URL. \
For example, `/openam`.";

const FIXED_VALUE_DESCRIPTION: &str = "If Fixed value is selected as the Base URL source, \
enter the base URL in the Fixed value base URL field.";

const EXTENSION_CLASS_DESCRIPTION: &str = "If Extension class is selected as the Base URL source, \
enter `org.forgerock.openam.services.baseurl.BaseURLProvider` in the Extension class name field.";

/// Terraform state of the Base URL Source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct BaseUrlSourceModel {
    #[serde(default)]
    id: Option<String>,
    source: String,
    context_path: String,
    fixed_value: String,
    #[serde(default)]
    extension_class_name: Option<String>,
}

impl BaseUrlSourceModel {
    fn from_state(state: &Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(state.clone())?)
    }

    fn into_state(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    fn to_api(&self) -> BaseUrlSource {
        BaseUrlSource {
            source: self.source.clone(),
            context_path: self.context_path.clone(),
            fixed_value: self.fixed_value.clone(),
            extension_class_name: self.extension_class_name.clone().unwrap_or_default(),
        }
    }

    fn from_api(source: BaseUrlSource) -> Self {
        let extension_class_name = Some(source.extension_class_name)
            .filter(|name| !name.is_empty());
        Self {
            id: Some(BASE_URL_SOURCE_ID.to_string()),
            source: source.source,
            context_path: source.context_path,
            fixed_value: source.fixed_value,
            extension_class_name,
        }
    }

    /// State after a write: the API's answer, or what was sent if it answered with nothing.
    fn after_write(&self, stored: Option<BaseUrlSource>) -> Self {
        match stored {
            Some(source) => Self::from_api(source),
            None => Self {
                id: Some(BASE_URL_SOURCE_ID.to_string()),
                ..self.clone()
            },
        }
    }
}

/// Manages the Base URL Source service of the configured realm.
pub struct BaseUrlSourceResource;

#[async_trait::async_trait]
impl ManagedResource for BaseUrlSourceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("PingAM Base URL Source")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Always `baseurl`."),
            )
            .with_attribute(
                "source",
                Attribute::required_string().with_description(SOURCE_DESCRIPTION),
            )
            .with_attribute(
                "context_path",
                Attribute::required_string().with_description(CONTEXT_PATH_DESCRIPTION),
            )
            .with_attribute(
                "fixed_value",
                Attribute::required_string().with_description(FIXED_VALUE_DESCRIPTION),
            )
            .with_attribute(
                "extension_class_name",
                Attribute::optional_string().with_description(EXTENSION_CLASS_DESCRIPTION),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(diagnostic) = one_of(config, "source", &BaseUrlSourceKind::names()) {
            diagnostics.push(diagnostic);
            return diagnostics;
        }

        let text = |name: &str| config.get(name).and_then(Value::as_str).unwrap_or_default();
        match text("source").parse::<BaseUrlSourceKind>() {
            Ok(BaseUrlSourceKind::ExtensionClass) if text("extension_class_name").is_empty() => {
                diagnostics.push(
                    Diagnostic::error("Missing extension class name")
                        .with_detail("extension_class_name is required for EXTENSION_CLASS")
                        .with_attribute("extension_class_name"),
                );
            }
            Ok(BaseUrlSourceKind::FixedValue) if text("fixed_value").is_empty() => {
                diagnostics.push(
                    Diagnostic::error("Missing fixed value")
                        .with_detail("fixed_value must not be empty when source is FIXED_VALUE")
                        .with_attribute("fixed_value"),
                );
            }
            _ => {}
        }

        let context_path = text("context_path");
        if !context_path.is_empty() && !context_path.starts_with('/') {
            diagnostics.push(
                Diagnostic::warning("Context path without leading slash")
                    .with_detail(format!(
                        "context_path '{}' usually starts with '/', for example `/openam`",
                        context_path
                    ))
                    .with_attribute("context_path"),
            );
        }
        diagnostics
    }

    fn plan(&self, prior: Option<&Value>, proposed: &Value) -> PlanResult {
        let mut proposed = proposed.clone();
        if let Value::Object(attributes) = &mut proposed {
            attributes.insert("id".to_string(), json!(BASE_URL_SOURCE_ID));
        }
        plan_resource(&self.schema(), prior, &proposed)
    }

    async fn create(&self, api: &dyn IdentityApi, planned: &Value) -> Result<Value, ProviderError> {
        let model = BaseUrlSourceModel::from_state(planned)?;
        let source = model.to_api();
        let context = "Unable to create Base URL service";
        let stored = match api.create_base_url_source(&source).await {
            Ok(stored) => stored,
            Err(error) if error.is_conflict() => {
                info!("Base URL service already exists, updating it instead");
                api.update_base_url_source(&source)
                    .await
                    .map_err(|error| ProviderError::client(context, error))?
            }
            Err(error) => return Err(ProviderError::client(context, error)),
        };
        debug!("Created Base URL service");
        model.after_write(stored).into_state()
    }

    async fn read(&self, api: &dyn IdentityApi, _current: &Value) -> Result<Value, ProviderError> {
        match api.get_base_url_source().await {
            Ok(source) => BaseUrlSourceModel::from_api(source).into_state(),
            Err(error) if error.is_not_found() => {
                info!("Base URL service not found");
                Ok(Value::Null)
            }
            Err(error) => Err(ProviderError::client("Unable to read Base URL service", error)),
        }
    }

    async fn update(
        &self,
        api: &dyn IdentityApi,
        _prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let model = BaseUrlSourceModel::from_state(planned)?;
        let source = model.to_api();
        let context = "Unable to update Base URL service";
        let stored = match api.update_base_url_source(&source).await {
            Ok(stored) => stored,
            Err(error) if error.is_not_found() => {
                info!("Base URL service is missing, creating it instead");
                api.create_base_url_source(&source)
                    .await
                    .map_err(|error| ProviderError::client(context, error))?
            }
            Err(error) => return Err(ProviderError::client(context, error)),
        };
        model.after_write(stored).into_state()
    }

    async fn delete(&self, api: &dyn IdentityApi, _current: &Value) -> Result<(), ProviderError> {
        match api.delete_base_url_source().await {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => {
                debug!("Base URL service already deleted");
                Ok(())
            }
            Err(error) => Err(ProviderError::client("Unable to delete Base URL service", error)),
        }
    }

    async fn import(&self, api: &dyn IdentityApi, id: &str) -> Result<Value, ProviderError> {
        debug!(id, "Importing Base URL service");
        let state = self.read(api, &Value::Null).await?;
        if state.is_null() {
            return Err(ProviderError::NotFound(
                "Base URL service is not configured in this realm".to_string(),
            ));
        }
        Ok(state)
    }
}

/// Reads the Base URL Source service of the configured realm.
pub struct BaseUrlSourceDataSource;

#[async_trait::async_trait]
impl DataSource for BaseUrlSourceDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("PingAM Base URL Source")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "source",
                Attribute::computed_string().with_description(SOURCE_DESCRIPTION),
            )
            .with_attribute(
                "context_path",
                Attribute::computed_string().with_description(CONTEXT_PATH_DESCRIPTION),
            )
            .with_attribute(
                "fixed_value",
                Attribute::computed_string().with_description(FIXED_VALUE_DESCRIPTION),
            )
            .with_attribute(
                "extension_class_name",
                Attribute::computed_string().with_description(EXTENSION_CLASS_DESCRIPTION),
            )
    }

    async fn read(&self, api: &dyn IdentityApi, _config: &Value) -> Result<Value, ProviderError> {
        match api.get_base_url_source().await {
            Ok(source) => BaseUrlSourceModel::from_api(source).into_state(),
            Err(error) if error.is_not_found() => Err(ProviderError::NotFound(
                "Base URL service is not configured in this realm".to_string(),
            )),
            Err(error) => Err(ProviderError::client("Unable to read Base URL service", error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{fixture, ClientError};
    use crate::schema::has_errors;

    fn planned(source: &str) -> Value {
        json!({
            "id": "baseurl",
            "source": source,
            "context_path": "/am",
            "fixed_value": "https://id.example.com",
            "extension_class_name": null,
        })
    }

    fn seeded(source: &str) -> fixture::Client {
        fixture::Client::default().with_base_url_source(remote(source))
    }

    fn remote(source: &str) -> BaseUrlSource {
        BaseUrlSource {
            source: source.into(),
            context_path: "/openam".into(),
            fixed_value: String::new(),
            extension_class_name: String::new(),
        }
    }

    #[test]
    fn test_validate_source() {
        let resource = BaseUrlSourceResource;
        assert!(resource.validate(&planned("FIXED_VALUE")).is_empty());

        let diagnostics = resource.validate(&planned("SOMETHING_ELSE"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("source"));
    }

    #[test]
    fn test_validate_source_requirements() {
        let resource = BaseUrlSourceResource;
        let mut config = planned("EXTENSION_CLASS");
        let diagnostics = resource.validate(&config);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("extension_class_name")
        );

        config["extension_class_name"] =
            json!("org.forgerock.openam.services.baseurl.BaseURLProvider");
        assert!(resource.validate(&config).is_empty());

        let mut config = planned("FIXED_VALUE");
        config["fixed_value"] = json!("");
        assert!(has_errors(&resource.validate(&config)));

        let mut config = planned("REQUEST_VALUES");
        config["fixed_value"] = json!("");
        assert!(resource.validate(&config).is_empty());
    }

    #[test]
    fn test_validate_context_path_warning() {
        let mut config = planned("REQUEST_VALUES");
        config["context_path"] = json!("openam");
        let diagnostics = BaseUrlSourceResource.validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
    }

    #[test]
    fn test_plan_sets_id() {
        let mut proposed = planned("REQUEST_VALUES");
        proposed["id"] = Value::Null;
        let plan = BaseUrlSourceResource.plan(None, &proposed);
        assert_eq!(plan.planned_state["id"], "baseurl");
    }

    #[tokio::test]
    async fn test_create() {
        let client = fixture::Client::default();
        let state = BaseUrlSourceResource
            .create(&client, &planned("FIXED_VALUE"))
            .await
            .unwrap();
        assert_eq!(state, planned("FIXED_VALUE"));
        assert_eq!(client.base_url_source().unwrap().context_path, "/am");
    }

    #[tokio::test]
    async fn test_create_existing_updates() {
        let client = seeded("REQUEST_VALUES");
        let state = BaseUrlSourceResource
            .create(&client, &planned("FIXED_VALUE"))
            .await
            .unwrap();
        assert_eq!(state["source"], "FIXED_VALUE");
        assert_eq!(
            client.calls(),
            vec!["create_base_url_source", "update_base_url_source"]
        );
        assert_eq!(client.base_url_source().unwrap().source, "FIXED_VALUE");
    }

    #[tokio::test]
    async fn test_create_with_empty_response_keeps_plan() {
        let client = fixture::Client::default();
        client.empty_create_responses();
        let state = BaseUrlSourceResource
            .create(&client, &planned("FIXED_VALUE"))
            .await
            .unwrap();
        assert_eq!(state, planned("FIXED_VALUE"));
    }

    #[tokio::test]
    async fn test_create_error() {
        let client = fixture::Client::default();
        client.fail_next(ClientError::Status {
            status: 400,
            body: "bad".into(),
        });
        let error = BaseUrlSourceResource
            .create(&client, &planned("FIXED_VALUE"))
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unable to create Base URL service, got error: status: 400, body: bad"
        );
    }

    #[tokio::test]
    async fn test_read_maps_empty_extension_class() {
        let client = seeded("REQUEST_VALUES");
        let state = BaseUrlSourceResource
            .read(&client, &planned("REQUEST_VALUES"))
            .await
            .unwrap();
        assert_eq!(state["id"], "baseurl");
        assert_eq!(state["context_path"], "/openam");
        assert!(state["extension_class_name"].is_null());
    }

    #[tokio::test]
    async fn test_read_missing_is_null() {
        let client = fixture::Client::default();
        let state = BaseUrlSourceResource
            .read(&client, &planned("REQUEST_VALUES"))
            .await
            .unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_update_missing_creates() {
        let client = fixture::Client::default();
        let state = BaseUrlSourceResource
            .update(&client, &planned("REQUEST_VALUES"), &planned("FIXED_VALUE"))
            .await
            .unwrap();
        assert_eq!(state["source"], "FIXED_VALUE");
        assert_eq!(
            client.calls(),
            vec!["update_base_url_source", "create_base_url_source"]
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let client = seeded("REQUEST_VALUES");
        let resource = BaseUrlSourceResource;
        let state = planned("REQUEST_VALUES");
        resource.delete(&client, &state).await.unwrap();
        resource.delete(&client, &state).await.unwrap();
        assert!(client.base_url_source().is_none());
    }

    #[tokio::test]
    async fn test_delete_error() {
        let client = fixture::Client::default();
        client.fail_next(ClientError::Status {
            status: 500,
            body: "boom".into(),
        });
        let error = BaseUrlSourceResource
            .delete(&client, &Value::Null)
            .await
            .unwrap_err();
        assert_eq!(error.summary(), "Client Error");
    }

    #[tokio::test]
    async fn test_import() {
        let client = seeded("X_FORWARDED_HEADERS");
        let state = BaseUrlSourceResource
            .import(&client, "anything")
            .await
            .unwrap();
        assert_eq!(state["source"], "X_FORWARDED_HEADERS");
    }

    #[tokio::test]
    async fn test_data_source() {
        let client = fixture::Client::default();
        let error = BaseUrlSourceDataSource
            .read(&client, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::NotFound(_)));

        let client = client.with_base_url_source(remote("REQUEST_VALUES"));
        let state = BaseUrlSourceDataSource
            .read(&client, &json!({}))
            .await
            .unwrap();
        assert_eq!(state["source"], "REQUEST_VALUES");
        assert_eq!(state["id"], "baseurl");
    }
}
