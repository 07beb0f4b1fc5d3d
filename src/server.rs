//! Serving a provider over the plugin protocol.
//!
//! [`ProviderService`] is the trait providers implement; [`serve`] starts a
//! gRPC server on a loopback port and announces it to the host on stdout.
//!
//! # Signal Handling
//!
//! On SIGTERM or SIGINT the server stops accepting connections and waits up
//! to [`ServeOptions::shutdown_timeout`] for in-flight requests, then calls
//! [`ProviderService::stop`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated;
use crate::schema::{has_errors, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{
    decode, encode, handshake_line, ImportedResource, PlanResult, ProviderMetadata,
    MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE,
};

/// Trait that provider implementations must implement.
///
/// Values are plain JSON documents; the gRPC layer takes care of the wire
/// encoding and turns returned errors into diagnostics.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata, derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan changes for a resource.
    ///
    /// `prior_state` is `None` on create; `proposed_state` is `null` on destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Read the current state of a resource, `null` if it no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Import an existing remote object into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read a data source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

/// Wrapper that implements the generated gRPC trait.
pub(crate) struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

impl<P: ProviderService> ProviderGrpcService<P> {
    pub(crate) fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<generated::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| generated::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => generated::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: &ProviderError) -> Vec<generated::Diagnostic> {
    diagnostics_to_proto(vec![err.to_diagnostic()])
}

fn schema_to_proto(schema: &Schema) -> generated::Schema {
    generated::Schema {
        version: schema.version as i64,
        block: Some(generated::Block {
            attributes: schema
                .attributes
                .iter()
                .map(|(name, attr)| generated::Attribute {
                    name: name.clone(),
                    r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                    required: attr.flags.required,
                    optional: attr.flags.optional,
                    computed: attr.flags.computed,
                    sensitive: attr.flags.sensitive,
                    description: attr.description.clone().unwrap_or_default(),
                    force_new: attr.force_new,
                    default_value: attr.default.as_ref().map(encode).unwrap_or_default(),
                })
                .collect(),
            description: schema.description.clone().unwrap_or_default(),
        }),
    }
}

/// Decode a JSON field of a request.
fn decode_field(bytes: &[u8], field: &str) -> Result<Value, ProviderError> {
    decode(bytes).map_err(|e| ProviderError::InvalidRequest(format!("{}: {}", field, e)))
}

fn log_diagnostics(operation: &str, diagnostics: &[Diagnostic]) {
    let count = diagnostics.len();
    if has_errors(diagnostics) {
        warn!(diagnostics = count, "{operation} completed with errors");
    } else {
        info!(warnings = count, "{operation} completed successfully");
    }
}

#[tonic::async_trait]
impl<P: ProviderService> generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<generated::GetMetadataRequest>,
    ) -> Result<tonic::Response<generated::GetMetadataResponse>, tonic::Status> {
        let metadata = self.provider.metadata();
        info!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(generated::GetMetadataResponse {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<generated::GetSchemaRequest>,
    ) -> Result<tonic::Response<generated::GetSchemaResponse>, tonic::Status> {
        let schema = self.provider.schema();
        info!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetSchema completed"
        );
        Ok(tonic::Response::new(generated::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateProviderConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode_field(&req.config, "config") {
            Ok(config) => self.provider.validate_provider_config(config).await,
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateProviderConfig", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateProviderConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), fields(terraform_version), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<generated::ConfigureRequest>,
    ) -> Result<tonic::Response<generated::ConfigureResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("terraform_version", req.terraform_version.as_str());
        let result = match decode_field(&req.config, "config") {
            Ok(config) => self.provider.configure(config).await,
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("Configure", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(generated::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<generated::StopRequest>,
    ) -> Result<tonic::Response<generated::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            }
        };
        Ok(tonic::Response::new(generated::StopResponse { error }))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode_field(&req.config, "config") {
            Ok(config) => {
                self.provider
                    .validate_resource_config(&req.resource_type, config)
                    .await
            }
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateResourceConfig", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateResourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<generated::PlanRequest>,
    ) -> Result<tonic::Response<generated::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        let is_create = req.prior_state.is_empty();
        debug!(is_create, "Plan called");

        let result = async {
            let prior_state = match decode_field(&req.prior_state, "prior_state")? {
                Value::Null => None,
                prior => Some(prior),
            };
            let proposed_state = decode_field(&req.proposed_state, "proposed_state")?;
            let config = decode_field(&req.config, "config")?;
            self.provider
                .plan(&req.resource_type, prior_state, proposed_state, config)
                .await
        }
        .await;

        match result {
            Ok(result) => {
                info!(
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                Ok(tonic::Response::new(generated::PlanResponse {
                    planned_state: encode(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }))
            }
            Err(e) => {
                error!(error = %e, "Plan failed");
                Ok(tonic::Response::new(generated::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(&e),
                }))
            }
        }
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<generated::CreateRequest>,
    ) -> Result<tonic::Response<generated::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!("Create called");
        let result = match decode_field(&req.planned_state, "planned_state") {
            Ok(planned) => self.provider.create(&req.resource_type, planned).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(state) => {
                info!("Create completed successfully");
                Ok(tonic::Response::new(generated::CreateResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }))
            }
            Err(e) => {
                error!(error = %e, "Create failed");
                Ok(tonic::Response::new(generated::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            }
        }
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<generated::ReadRequest>,
    ) -> Result<tonic::Response<generated::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!("Read called");
        let result = match decode_field(&req.current_state, "current_state") {
            Ok(current_state) => self.provider.read(&req.resource_type, current_state).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(state) => {
                if state.is_null() {
                    info!("Remote object no longer exists, removing from state");
                } else {
                    debug!("Read completed successfully");
                }
                Ok(tonic::Response::new(generated::ReadResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }))
            }
            Err(e) => {
                error!(error = %e, "Read failed");
                Ok(tonic::Response::new(generated::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            }
        }
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<generated::UpdateRequest>,
    ) -> Result<tonic::Response<generated::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!("Update called");
        let result = async {
            let prior_state = decode_field(&req.prior_state, "prior_state")?;
            let planned_state = decode_field(&req.planned_state, "planned_state")?;
            self.provider
                .update(&req.resource_type, prior_state, planned_state)
                .await
        }
        .await;
        match result {
            Ok(state) => {
                info!("Update completed successfully");
                Ok(tonic::Response::new(generated::UpdateResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }))
            }
            Err(e) => {
                error!(error = %e, "Update failed");
                Ok(tonic::Response::new(generated::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            }
        }
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<generated::DeleteRequest>,
    ) -> Result<tonic::Response<generated::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        info!("Delete called");
        let result = match decode_field(&req.current_state, "current_state") {
            Ok(current) => self.provider.delete(&req.resource_type, current).await,
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(()) => {
                info!("Delete completed successfully");
                vec![]
            }
            Err(e) => {
                error!(error = %e, "Delete failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(generated::DeleteResponse { diagnostics }))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type, id = %request.get_ref().id), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<generated::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<generated::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!("ImportResourceState called");
        match self
            .provider
            .import_resource(&req.resource_type, &req.id)
            .await
        {
            Ok(imported) => {
                info!(
                    imported_count = imported.len(),
                    "ImportResourceState completed"
                );
                Ok(tonic::Response::new(
                    generated::ImportResourceStateResponse {
                        imported: imported.into_iter().map(Into::into).collect(),
                        diagnostics: vec![],
                    },
                ))
            }
            Err(e) => {
                error!(error = %e, "ImportResourceState failed");
                Ok(tonic::Response::new(
                    generated::ImportResourceStateResponse {
                        imported: vec![],
                        diagnostics: error_to_diagnostics(&e),
                    },
                ))
            }
        }
    }

    #[instrument(skip(self, request), fields(data_source_type = %request.get_ref().data_source_type), name = "grpc.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<generated::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateDataSourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode_field(&req.config, "config") {
            Ok(config) => {
                self.provider
                    .validate_data_source_config(&req.data_source_type, config)
                    .await
            }
            Err(e) => Err(e),
        };
        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateDataSourceConfig", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateDataSourceConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateDataSourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), fields(data_source_type = %request.get_ref().data_source_type), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<generated::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<generated::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!("ReadDataSource called");
        let result = match decode_field(&req.config, "config") {
            Ok(config) => {
                self.provider
                    .read_data_source(&req.data_source_type, config)
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(state) => {
                info!("ReadDataSource completed successfully");
                Ok(tonic::Response::new(generated::ReadDataSourceResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }))
            }
            Err(e) => {
                error!(error = %e, "ReadDataSource failed");
                Ok(tonic::Response::new(generated::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }))
            }
        }
    }
}

/// The plugin was started directly instead of by its host.
#[derive(Debug, thiserror::Error)]
#[error(
    "This binary is a plugin. These are not meant to be executed directly. \
     Please execute the program that consumes these plugins, which will load \
     any plugins automatically"
)]
pub struct NotLaunchedByHost;

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long to wait for in-flight requests after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
    /// Refuse to start unless the host's magic cookie is set. Default: true.
    pub require_magic_cookie: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
            require_magic_cookie: true,
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Start even when the magic cookie is missing, e.g. when debugging.
    pub fn without_magic_cookie(mut self) -> Self {
        self.require_magic_cookie = false;
        self
    }
}

fn check_magic_cookie(
    options: &ServeOptions,
    cookie: Option<String>,
) -> Result<(), NotLaunchedByHost> {
    if !options.require_magic_cookie {
        return Ok(());
    }
    match cookie {
        Some(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(NotLaunchedByHost),
    }
}

/// Wait for a shutdown signal, returning its name.
///
/// On Unix this waits for SIGTERM or SIGINT, on Windows for CTRL+C.
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            _ = sigint.recv() => Ok("SIGINT"),
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await?;
        Ok("CTRL+C")
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<std::io::Result<&'static str>>().await
    }
}

/// Serve a provider implementation as a gRPC server.
///
/// This function:
/// 1. Checks the plugin was launched by its host
/// 2. Binds a free loopback port and starts the gRPC server
/// 3. Writes the handshake line to stdout
/// 4. Handles shutdown signals (SIGTERM/SIGINT) gracefully
///
/// The handshake format is `1|1|tcp|<address>|grpc`.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    check_magic_cookie(&options, std::env::var(MAGIC_COOKIE_KEY).ok())?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    serve_on_listener(provider, listener, addr, options).await
}

/// Serve a provider on a specific address.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// Serve a provider on a specific address with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    check_magic_cookie(&options, std::env::var(MAGIC_COOKIE_KEY).ok())?;
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;
    serve_on_listener(provider, listener, actual_addr, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", handshake_line(addr));
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let service = ProviderGrpcService::new(Arc::clone(&provider));
    let server = generated::provider_server::ProviderServer::new(service);

    let shutdown = Arc::new(Notify::new());
    let server_shutdown = Arc::clone(&shutdown);
    let server_future = Server::builder()
        .add_service(server)
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move { server_shutdown.notified().await },
        );
    tokio::pin!(server_future);

    let signal = async {
        match wait_for_shutdown_signal().await {
            Ok(name) => info!(signal = name, "Received shutdown signal"),
            Err(e) => {
                error!(error = %e, "Unable to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = &mut server_future => {
            if let Err(e) = result {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
        }
        _ = signal => {
            shutdown.notify_one();
            match tokio::time::timeout(options.shutdown_timeout, &mut server_future).await {
                Ok(Ok(())) => info!("Server shutdown complete"),
                Ok(Err(e)) => {
                    error!(error = %e, "Server error during shutdown");
                    return Err(e.into());
                }
                Err(_) => warn!(
                    timeout = ?options.shutdown_timeout,
                    "Shutdown timeout exceeded, forcing shutdown"
                ),
            }
        }
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}
