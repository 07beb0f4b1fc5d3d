//! Provider plugin for ForgeRock/PingAM and PingOne Advanced Identity Cloud.
//!
//! The plugin manages two kinds of identity platform configuration:
//!
//! - `fram_am_baseurlsource`: the realm's Base URL Source service (a singleton)
//! - `fram_p1aic_serviceaccount`: service accounts of the identity cloud
//!
//! Both are exposed as resources and as data sources.
//!
//! # Layout
//!
//! - [`server`]: the gRPC plugin server, the [`ProviderService`] trait and the
//!   startup handshake
//! - [`schema`], [`validation`] and [`plan`]: schema description, configuration
//!   checks and plan computation shared by every resource
//! - [`client`]: the REST client for the platform's config and managed object APIs
//! - [`provider`]: [`FramProvider`], its configuration and its resources
//!
//! # Handshake
//!
//! The host starts the plugin with `TF_PLUGIN_MAGIC_COOKIE` set. Once the gRPC
//! server listens, one line is written to stdout:
//!
//! ```text
//! 1|1|tcp|127.0.0.1:50051|grpc
//! ```
//!
//! Format: `<core protocol>|<app protocol>|tcp|<address>|grpc`, see
//! [`handshake_line`]. Logs go to stderr.
//!
//! # Running
//!
//! ```ignore
//! use terraform_provider_fram::{serve, FramProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     terraform_provider_fram::try_init_logging();
//!     serve(FramProvider::new()).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod server;
#[cfg(any(test, feature = "test-fixture"))]
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{FramProvider, ProviderConfig, PROVIDER_NAME};
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    handshake_line, AttributeChange, ImportedResource, PlanResult, ProviderMetadata,
    ServerCapabilities, CORE_PROTOCOL_VERSION, MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE,
    PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
