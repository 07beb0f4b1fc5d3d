//! The `fram` provider: configuration, resources and data sources.
//!
//! [`FramProvider`] implements [`ProviderService`] by dispatching each call on
//! the resource or data source type name to a [`ManagedResource`] or
//! [`DataSource`], handing them the API client built by `configure`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::{ClientError, ClientOptions, HttpClient, IdentityApi};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::schema::{has_errors, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

mod base_url_source;
mod config;
mod service_account;

pub use self::base_url_source::{BaseUrlSourceDataSource, BaseUrlSourceResource};
pub use self::config::{process_env, EnvLookup, ProviderConfig};
pub use self::service_account::{ServiceAccountDataSource, ServiceAccountResource};

/// Name of the provider, prefix of every type name.
pub const PROVIDER_NAME: &str = "fram";

/// A resource type managed by the provider.
#[async_trait::async_trait]
pub trait ManagedResource: Send + Sync {
    /// Type name, e.g. `fram_am_baseurlsource`.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource.
    fn schema(&self) -> Schema;

    /// Checks beyond the schema, run after schema validation passes.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        vec![]
    }

    /// Plan a change; the default diffs the states against the schema.
    fn plan(&self, prior: Option<&Value>, proposed: &Value) -> PlanResult {
        plan_resource(&self.schema(), prior, proposed)
    }

    /// Create the remote object, returning the new state.
    async fn create(&self, api: &dyn IdentityApi, planned: &Value) -> Result<Value, ProviderError>;

    /// Refresh the state, `null` when the remote object is gone.
    async fn read(&self, api: &dyn IdentityApi, current: &Value) -> Result<Value, ProviderError>;

    /// Update the remote object, returning the new state.
    async fn update(
        &self,
        api: &dyn IdentityApi,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object.
    async fn delete(&self, api: &dyn IdentityApi, current: &Value) -> Result<(), ProviderError>;

    /// Produce the state of an existing remote object.
    async fn import(&self, api: &dyn IdentityApi, id: &str) -> Result<Value, ProviderError>;
}

/// A data source type exposed by the provider.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `fram_p1aic_serviceaccount`.
    fn type_name(&self) -> &'static str;

    /// Schema of the data source.
    fn schema(&self) -> Schema;

    /// Read the remote object described by the configuration.
    async fn read(&self, api: &dyn IdentityApi, config: &Value) -> Result<Value, ProviderError>;
}

type Connector =
    dyn Fn(ClientOptions) -> Result<Arc<dyn IdentityApi>, ClientError> + Send + Sync;

/// The `fram` provider.
pub struct FramProvider {
    api: RwLock<Option<Arc<dyn IdentityApi>>>,
    connector: Box<Connector>,
    env: Box<EnvLookup>,
    resources: BTreeMap<&'static str, Box<dyn ManagedResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl Default for FramProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FramProvider {
    /// Create a provider talking to the platform over HTTP once configured.
    pub fn new() -> Self {
        let resources: Vec<Box<dyn ManagedResource>> = vec![
            Box::new(BaseUrlSourceResource),
            Box::new(ServiceAccountResource),
        ];
        let data_sources: Vec<Box<dyn DataSource>> = vec![
            Box::new(BaseUrlSourceDataSource),
            Box::new(ServiceAccountDataSource),
        ];
        Self {
            api: RwLock::new(None),
            connector: Box::new(|options: ClientOptions| {
                let client = HttpClient::with(options)?;
                Ok(Arc::new(client) as Arc<dyn IdentityApi>)
            }),
            env: Box::new(process_env),
            resources: resources.into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: data_sources
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
        }
    }

    /// Create a provider that uses the given API client once configured.
    ///
    /// The client is also available before `configure` is called.
    pub fn with_client(api: Arc<dyn IdentityApi>) -> Self {
        let connected = Arc::clone(&api);
        let mut provider = Self::new();
        provider.api = RwLock::new(Some(api));
        provider.connector = Box::new(move |_: ClientOptions| Ok(Arc::clone(&connected)));
        provider
    }

    /// Replace how environment variables are looked up.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    async fn api(&self) -> Result<Arc<dyn IdentityApi>, ProviderError> {
        self.api.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "the provider must be configured before managing resources".to_string(),
            )
        })
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn ManagedResource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for FramProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }
        diagnostics.extend(ProviderConfig::from_value(&config)?.validate());
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = self.validate_provider_config(config.clone()).await?;
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }
        let options = ProviderConfig::from_value(&config)?.resolve(self.env.as_ref())?;
        info!(
            host = %options.host,
            idm_host = %options.idm_host,
            realm = %options.realm,
            "Configuring identity platform client"
        );
        let api = (self.connector)(options).map_err(|error| {
            ProviderError::client("Unable to create identity platform client", error)
        })?;
        *self.api.write().await = Some(api);
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        debug!("Releasing identity platform client");
        self.api.write().await.take();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validate(&resource.schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(resource.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(resource.plan(prior_state.as_ref(), &proposed_state))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        resource.create(api.as_ref(), &planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        resource.read(api.as_ref(), &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        resource
            .update(api.as_ref(), &prior_state, &planned_state)
            .await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        resource.delete(api.as_ref(), &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let api = self.api().await?;
        let state = resource.import(api.as_ref(), id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let api = self.api().await?;
        data_source.read(api.as_ref(), &config).await
    }
}

/// Read a string attribute from a state or configuration object.
fn string_attr(value: &Value, name: &str) -> Option<String> {
    value
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fixture;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_schema_lists_every_type() {
        let schema = FramProvider::new().schema();
        let resources: Vec<_> = schema.resources.keys().cloned().collect();
        assert_eq!(
            resources,
            vec!["fram_am_baseurlsource", "fram_p1aic_serviceaccount"]
        );
        let data_sources: Vec<_> = schema.data_sources.keys().cloned().collect();
        assert_eq!(
            data_sources,
            vec!["fram_am_baseurlsource", "fram_p1aic_serviceaccount"]
        );
        assert!(schema.provider.attribute("host").is_some());

        let prefix = format!("{}_", PROVIDER_NAME);
        let mut names = resources.iter().chain(&data_sources);
        assert!(names.all(|name| name.starts_with(&prefix)));
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = FramProvider::new();
        let error = provider
            .read("fram_am_baseurlsource", json!({"id": "baseurl"}))
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::Configuration(_)));
        assert_eq!(error.summary(), "Provider Not Configured");
    }

    #[tokio::test]
    async fn test_configure_resolves_options() {
        let seen: Arc<Mutex<Option<ClientOptions>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let mut provider = FramProvider::new()
            .with_env(|key| (key == "FRAM_REALM").then(|| "/alpha".to_string()));
        provider.connector = Box::new(move |options: ClientOptions| {
            *captured.lock().unwrap() = Some(options);
            Ok(Arc::new(fixture::Client::default()) as Arc<dyn IdentityApi>)
        });

        let diagnostics = provider
            .configure(json!({"host": "https://id.example.com/am", "timeout": 10}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());

        let options = seen.lock().unwrap().clone().unwrap();
        assert_eq!(options.host.as_str(), "https://id.example.com/am/");
        assert_eq!(options.realm, "/alpha");
        assert_eq!(options.timeout, std::time::Duration::from_secs(10));
        assert!(provider.api().await.is_ok());
    }

    #[tokio::test]
    async fn test_configure_reports_invalid_config() {
        let provider = FramProvider::new().with_env(|_| None);
        let diagnostics = provider
            .configure(json!({"host": "ftp://id.example.com", "timeout": "soon"}))
            .await
            .unwrap();
        assert!(has_errors(&diagnostics));
        assert!(provider.api().await.is_err());
    }

    #[tokio::test]
    async fn test_configure_rejects_unusable_env_host() {
        let provider = FramProvider::new()
            .with_env(|key| (key == "FRAM_HOST").then(|| "localhost:8080".to_string()));
        let error = provider.configure(json!({})).await.unwrap_err();
        assert!(matches!(error, ProviderError::InvalidConfiguration(_)));
        assert_eq!(error.summary(), "Invalid Provider Configuration");
        assert!(provider.api().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_releases_client() {
        let provider = FramProvider::with_client(Arc::new(fixture::Client::default()));
        assert!(provider.api().await.is_ok());
        provider.stop().await.unwrap();
        assert!(provider.api().await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = FramProvider::with_client(Arc::new(fixture::Client::default()));
        let error = provider
            .validate_resource_config("fram_unknown", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::UnknownResource(_)));
        let error = provider
            .read_data_source("fram_unknown", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_import_wraps_state() {
        let client = Arc::new(fixture::Client::default());
        let provider = FramProvider::with_client(client);
        let error = provider
            .import_resource("fram_am_baseurlsource", "baseurl")
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_string_attr() {
        let state = json!({"id": "svc-1", "scopes": []});
        assert_eq!(string_attr(&state, "id").as_deref(), Some("svc-1"));
        assert_eq!(string_attr(&state, "scopes"), None);
        assert_eq!(string_attr(&state, "missing"), None);
    }
}
