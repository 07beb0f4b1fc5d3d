//! Error types surfaced by the provider.

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested remote object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The configuration or state failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation needed the API client before `configure` ran.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider configuration could not be turned into an API client.
    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// State or configuration could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The identity platform API rejected or failed a request.
    #[error("{context}, got error: {source}")]
    Client {
        /// What the provider was doing when the request failed.
        context: String,
        /// The underlying API client error.
        #[source]
        source: ClientError,
    },

    /// The request sent by the host is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation is not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Wrap an API client error with a description of the failed operation.
    ///
    /// ```
    /// use terraform_provider_fram::client::ClientError;
    /// use terraform_provider_fram::ProviderError;
    ///
    /// let err = ProviderError::client(
    ///     "Unable to delete Base URL service",
    ///     ClientError::Status { status: 500, body: "boom".into() },
    /// );
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Unable to delete Base URL service, got error: status: 500, body: boom",
    /// );
    /// ```
    pub fn client(context: impl Into<String>, source: ClientError) -> Self {
        Self::Client {
            context: context.into(),
            source,
        }
    }

    /// Short, human-readable category used as the diagnostic summary.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::Validation(_) => "Invalid Configuration",
            Self::Configuration(_) => "Provider Not Configured",
            Self::InvalidConfiguration(_) => "Invalid Provider Configuration",
            Self::UnknownResource(_) => "Unknown Resource Type",
            Self::Serialization(_) => "Invalid State",
            Self::Client { .. } => "Client Error",
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Unimplemented(_) => "Unsupported Operation",
        }
    }

    /// Convert the error into an error diagnostic for the host.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.summary()).with_detail(self.to_string())
    }
}

impl From<ClientError> for ProviderError {
    fn from(source: ClientError) -> Self {
        Self::client("Identity platform request failed", source)
    }
}
