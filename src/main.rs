use terraform_provider_fram::{serve, try_init_logging, FramProvider, PROVIDER_NAME};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    try_init_logging();
    tracing::info!(
        provider = PROVIDER_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "Starting provider plugin"
    );
    serve(FramProvider::new()).await
}
