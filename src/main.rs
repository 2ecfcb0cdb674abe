//! ContentValidator - content demand validation service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_validator::{
    analysis::{PerplexityClient, PerplexityConfig},
    config::Args,
    db::{mongo::redact_uri, MongoClient, MongoStore},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("content_validator={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let policy = args.quota_policy();
    info!("======================================");
    info!("  ContentValidator");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "MongoDB: {} (db: {})",
        redact_uri(&args.mongodb_uri),
        args.mongodb_db
    );
    info!(
        "Quota: {} standard / {} early adopter per {} days",
        policy.standard_limit, policy.early_adopter_limit, args.quota_window_days
    );
    info!("Provider model: {}", args.perplexity_model);
    info!("======================================");

    // MongoDB is the system of record; dev mode falls back to memory
    let mongo_store = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => match MongoStore::new(&client).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                Some(store)
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("MongoDB setup failed (dev mode, using in-memory store): {}", e);
                    None
                } else {
                    error!("MongoDB setup failed: {}", e);
                    std::process::exit(1);
                }
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let mut state = match mongo_store {
        Some(store) => AppState::with_mongo(args.clone(), store),
        None => AppState::in_memory(args.clone()),
    };

    match PerplexityConfig::from_args(&args) {
        Some(config) => {
            info!("Analysis provider: {}", config.base_url);
            state = state.with_provider(Arc::new(PerplexityClient::new(config)));
        }
        None => warn!("PERPLEXITY_API_KEY not set - validation disabled"),
    }

    if let Some(path) = &args.usage_log_path {
        if let Err(e) = state.usage_log.init_file(path.clone()).await {
            warn!("Usage logging disabled, cannot open {}: {}", path.display(), e);
        }
    }

    server::run(Arc::new(state)).await?;

    Ok(())
}
