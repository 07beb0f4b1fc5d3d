//! Harness driving a [`ProviderService`] through plan/apply/read cycles
//! without a gRPC server.
//!
//! ```ignore
//! # tokio_test::block_on(async {
//! use std::sync::Arc;
//! use serde_json::json;
//! use terraform_provider_fram::client::fixture;
//! use terraform_provider_fram::testing::ProviderTester;
//!
//! let client = Arc::new(fixture::Client::default());
//! let tester = ProviderTester::fram(Arc::clone(&client));
//! let state = tester
//!     .apply_create(
//!         "fram_am_baseurlsource",
//!         json!({
//!             "source": "REQUEST_VALUES",
//!             "context_path": "/am",
//!             "fixed_value": "",
//!         }),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(state["id"], "baseurl");
//! assert!(client.base_url_source().is_some());
//! # });
//! ```

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::client::fixture;
use crate::error::ProviderError;
use crate::provider::FramProvider;
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Errors of a test step.
#[derive(Debug, Error)]
pub enum TestError {
    /// The step returned error diagnostics.
    #[error("operation failed with diagnostics: {}", summarize(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// The step failed with a provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Reading the resource back after apply did not return the applied state.
    #[error("state drifted after apply: applied {applied}, read {read}")]
    Drift {
        /// State returned by create or update.
        applied: Value,
        /// State returned by the following read.
        read: Value,
    },
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match (&d.attribute, &d.detail) {
            (Some(attr), Some(detail)) => format!("{} ({}): {}", d.summary, attr, detail),
            (Some(attr), None) => format!("{} ({})", d.summary, attr),
            (None, Some(detail)) => format!("{}: {}", d.summary, detail),
            (None, None) => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fail with the error diagnostics if there are any, else pass warnings through.
pub fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>, TestError> {
    if has_errors(&diagnostics) {
        let errors = diagnostics.into_iter().filter(Diagnostic::is_error);
        return Err(TestError::Diagnostics(errors.collect()));
    }
    Ok(diagnostics)
}

/// Drives a provider the way the host would.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<FramProvider> {
    /// A `fram` provider backed by the in-memory client, ready to use.
    pub fn fram(client: Arc<fixture::Client>) -> Self {
        Self::new(FramProvider::with_client(client))
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Schema of the provider.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Validate a resource configuration, failing on error diagnostics.
    pub async fn validate(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan a resource change; the configuration doubles as the proposed state.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior: Option<Value>,
        config: Value,
    ) -> Result<PlanResult, TestError> {
        Ok(self
            .provider
            .plan(resource_type, prior, config.clone(), config)
            .await?)
    }

    /// Create a resource from a planned state.
    pub async fn create(&self, resource_type: &str, planned: Value) -> Result<Value, TestError> {
        Ok(self.provider.create(resource_type, planned).await?)
    }

    /// Refresh a resource state.
    pub async fn read(&self, resource_type: &str, current: Value) -> Result<Value, TestError> {
        Ok(self.provider.read(resource_type, current).await?)
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior: Value,
        planned: Value,
    ) -> Result<Value, TestError> {
        Ok(self.provider.update(resource_type, prior, planned).await?)
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current: Value) -> Result<(), TestError> {
        Ok(self.provider.delete(resource_type, current).await?)
    }

    /// Import an existing remote object.
    pub async fn import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, TestError> {
        Ok(self.provider.import_resource(resource_type, id).await?)
    }

    /// Validate and read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        check_diagnostics(
            self.provider
                .validate_data_source_config(data_source_type, config.clone())
                .await?,
        )?;
        Ok(self
            .provider
            .read_data_source(data_source_type, config)
            .await?)
    }

    /// Validate, plan, create, then read back and compare.
    pub async fn apply_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate(resource_type, config.clone()).await?;
        let plan = self.plan(resource_type, None, config).await?;
        let applied = self.create(resource_type, plan.planned_state).await?;
        self.read_back(resource_type, applied).await
    }

    /// Validate, plan, update, then read back and compare.
    ///
    /// An empty plan skips the update and returns the prior state.
    pub async fn apply_update(
        &self,
        resource_type: &str,
        prior: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate(resource_type, config.clone()).await?;
        let plan = self.plan(resource_type, Some(prior.clone()), config).await?;
        if !plan.has_changes() {
            return Ok(prior);
        }
        let applied = self.update(resource_type, prior, plan.planned_state).await?;
        self.read_back(resource_type, applied).await
    }

    /// Plan the destruction, delete, then check that a read finds nothing.
    pub async fn apply_destroy(
        &self,
        resource_type: &str,
        current: Value,
    ) -> Result<(), TestError> {
        let plan = self
            .plan(resource_type, Some(current.clone()), Value::Null)
            .await?;
        self.delete(resource_type, current.clone()).await?;
        if !plan.planned_state.is_null() {
            return Err(TestError::Drift {
                applied: Value::Null,
                read: plan.planned_state,
            });
        }
        let read = self.read(resource_type, current).await?;
        if read.is_null() {
            Ok(())
        } else {
            Err(TestError::Drift {
                applied: Value::Null,
                read,
            })
        }
    }

    async fn read_back(&self, resource_type: &str, applied: Value) -> Result<Value, TestError> {
        let read = self.read(resource_type, applied.clone()).await?;
        if read != applied {
            return Err(TestError::Drift { applied, read });
        }
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceAccount;
    use crate::schema::DiagnosticSeverity;
    use serde_json::json;

    const JWKS: &str = r#"{"keys":[{"kty":"RSA","kid":"ci","e":"AQAB","n":"abc"}]}"#;

    fn service_account_config(description: &str) -> Value {
        json!({
            "name": "ci",
            "description": description,
            "scopes": ["fr:am:*", "fr:idm:*"],
            "account_status": "Active",
            "jwks": JWKS,
        })
    }

    #[tokio::test]
    async fn test_base_url_source_lifecycle() {
        let client = Arc::new(fixture::Client::default());
        let tester = ProviderTester::fram(Arc::clone(&client));
        let config = json!({
            "source": "FIXED_VALUE",
            "context_path": "/am",
            "fixed_value": "https://id.example.com",
        });

        let created = tester
            .apply_create("fram_am_baseurlsource", config.clone())
            .await
            .unwrap();
        assert_eq!(created["fixed_value"], "https://id.example.com");

        let unchanged = tester
            .apply_update("fram_am_baseurlsource", created.clone(), created.clone())
            .await
            .unwrap();
        assert_eq!(unchanged, created);

        let mut changed = created.clone();
        changed["source"] = json!("REQUEST_VALUES");
        let updated = tester
            .apply_update("fram_am_baseurlsource", created, changed)
            .await
            .unwrap();
        assert_eq!(updated["source"], "REQUEST_VALUES");

        tester
            .apply_destroy("fram_am_baseurlsource", updated)
            .await
            .unwrap();
        assert!(client.base_url_source().is_none());
    }

    #[tokio::test]
    async fn test_service_account_lifecycle() {
        let client = Arc::new(fixture::Client::default());
        let tester = ProviderTester::fram(Arc::clone(&client));

        let created = tester
            .apply_create("fram_p1aic_serviceaccount", service_account_config("first"))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let mut config = service_account_config("second");
        config["id"] = created["id"].clone();
        let updated = tester
            .apply_update("fram_p1aic_serviceaccount", created, config)
            .await
            .unwrap();
        assert_eq!(updated["id"], id.as_str());
        assert_eq!(client.service_account(&id).unwrap().description, "second");

        let imported = tester
            .import("fram_p1aic_serviceaccount", &id)
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state, updated);

        tester
            .apply_destroy("fram_p1aic_serviceaccount", updated)
            .await
            .unwrap();
        assert!(client.service_account(&id).is_none());
    }

    #[tokio::test]
    async fn test_drift_is_reported() {
        let client = Arc::new(fixture::Client::default());
        let tester = ProviderTester::fram(Arc::clone(&client));
        let created = tester
            .apply_create("fram_p1aic_serviceaccount", service_account_config("first"))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        client.insert_service_account(ServiceAccount {
            id: id.clone(),
            account_status: "Inactive".into(),
            ..Default::default()
        });
        let read = tester
            .read("fram_p1aic_serviceaccount", created)
            .await
            .unwrap();
        assert_eq!(read["account_status"], "Inactive");
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_apply() {
        let client = Arc::new(fixture::Client::default());
        let tester = ProviderTester::fram(Arc::clone(&client));
        let error = tester
            .apply_create(
                "fram_am_baseurlsource",
                json!({"source": "NOPE", "context_path": "/", "fixed_value": ""}),
            )
            .await
            .unwrap_err();
        match error {
            TestError::Diagnostics(diagnostics) => {
                assert_eq!(diagnostics[0].attribute.as_deref(), Some("source"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_data_sources() {
        let client = Arc::new(fixture::Client::default());
        let tester = ProviderTester::fram(Arc::clone(&client));
        let created = tester
            .apply_create("fram_p1aic_serviceaccount", service_account_config("first"))
            .await
            .unwrap();

        let read = tester
            .read_data_source("fram_p1aic_serviceaccount", json!({"id": created["id"]}))
            .await
            .unwrap();
        assert_eq!(read, created);

        let error = tester
            .read_data_source("fram_p1aic_serviceaccount", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(error, TestError::Diagnostics(_)));
    }

    #[tokio::test]
    async fn test_configure_failure() {
        let tester = ProviderTester::new(FramProvider::new().with_env(|_| None));
        let error = tester
            .configure(json!({"timeout": 0}))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("timeout"));
    }

    #[test]
    fn test_check_diagnostics() {
        let warnings = vec![Diagnostic::warning("Context path without leading slash")];
        assert_eq!(check_diagnostics(warnings).unwrap().len(), 1);

        let error = check_diagnostics(vec![
            Diagnostic::warning("ignored"),
            Diagnostic::error("Invalid scope").with_attribute("scopes"),
        ])
        .unwrap_err();
        match &error {
            TestError::Diagnostics(diagnostics) => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(
            error.to_string(),
            "operation failed with diagnostics: Invalid scope (scopes)"
        );
    }
}
