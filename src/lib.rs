pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ocr;
pub mod server;
pub mod summary;
pub mod types;

pub use config::Config;
pub use error::{AnalysisError, ConfigError, Error, Result};
pub use extract::extract_receipt_fields;
pub use ocr::{AzureReceiptClient, ReceiptRecognizer};
pub use summary::format_raw_result;

use handlers::AppState;
use server::AppBuilder;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Read the configuration, connect the Azure client and serve the receipt API.
pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    info!(
        "Using model {} at {} (api-version {})",
        config.model_id, config.endpoint, config.api_version
    );

    let recognizer = Arc::new(AzureReceiptClient::new(&config)?);
    let app = AppBuilder::new(AppState { recognizer }, config.max_upload_bytes)
        .with_trace_layer()
        .with_cors_layer()
        .build();

    server::serve(app, config.bind_address).await?;
    Ok(())
}
