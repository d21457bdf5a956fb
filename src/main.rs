//! Achievement gateway binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use achievement_gateway::{
    auth::build_token_validator,
    config::Args,
    logging::init_tracing,
    rate_limit::spawn_cleanup_task,
    server::{self, AppState},
    storage::build_storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_tracing(&args.log_level, args.log_format);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = args.gateway_config();

    info!("======================================");
    info!("  Achievement Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen_addr());
    info!("Error mode: {}", config.error_mode.as_str());
    info!("Auth backend: {:?}", args.auth_backend);
    info!("Storage backend: {:?}", args.storage_backend);
    info!(
        "Rate limits: save_text={}/min get={}/min",
        config.save_limit_per_minute, config.read_limit_per_minute
    );
    info!("Strict JSON validation: {}", config.strict_json_validation);
    info!(
        "CORS origin: {}",
        config.admin_front_origin.as_deref().unwrap_or("(disabled)")
    );
    info!("======================================");

    let token_validator = match build_token_validator(&args) {
        Ok(validator) => validator,
        Err(e) => {
            error!("Token validator setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let storage = match build_storage(&args) {
        Ok(storage) => storage,
        Err(e) => {
            error!("Storage setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(config, token_validator, storage)?);

    if let Some(interval) = args.sweep_interval() {
        spawn_cleanup_task(Arc::clone(&state.rate_limiter), interval);
        info!("Rate limiter sweep every {:?}", interval);
    }

    server::run(state, args.listen_addr()).await?;

    info!("Gateway stopped");
    Ok(())
}
