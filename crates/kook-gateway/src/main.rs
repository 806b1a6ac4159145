//! KOOK gateway client entry point
//!
//! Run with:
//! ```bash
//! cargo run -p kook-gateway
//! ```
//!
//! Configuration is loaded from environment variables; `KOOK_BOT_TOKEN` is required.

use kook_common::{try_init_tracing_with_config, AppConfig, AppError, AppResult, TracingConfig};
use kook_gateway::{ClientConfig, EventRegistry, GatewayClient, HttpGatewayResolver};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first so the log format follows APP_ENV
    let config = match AppConfig::from_env().map_err(AppError::from) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e} ({})", e.error_code());
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, code = e.error_code(), "Gateway client failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> AppResult<()> {
    info!("Starting KOOK gateway client...");

    info!(
        env = ?config.app.env,
        api_base_url = %config.gateway.api_base_url,
        compress = config.gateway.compress,
        "Configuration loaded"
    );

    let resolver =
        HttpGatewayResolver::new(&config.gateway).map_err(|e| AppError::Http(e.to_string()))?;
    let client_config = ClientConfig {
        name: config.app.name.clone(),
        ..ClientConfig::from(&config.gateway)
    };
    let client = GatewayClient::new(
        client_config,
        Arc::new(resolver),
        Arc::new(EventRegistry::standard()),
    );

    client.register_processor(|signal, lazy| async move {
        match lazy.get() {
            Ok(payload) => info!(
                sn = signal.sn,
                event_type = %signal.shell.event_type,
                target_id = %signal.shell.target_id,
                unsupported = payload.is_unsupported(),
                "Event"
            ),
            Err(e) => info!(sn = signal.sn, error = %e, "Event body could not be decoded"),
        }
        Ok(())
    });

    client.start().await.map_err(AppError::gateway)?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
        () = client.join() => {}
    }

    client.cancel(Some("shutdown")).await;
    info!("Gateway client stopped");

    Ok(())
}
