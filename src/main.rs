use marketplace_api::{
    AppState, bootstrap_admin,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{S3StorageClient, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects Postgres (running pending migrations)
/// and the object store, then serves the API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return Err(e.into());
        }
    };

    // 2. Logging: pretty locally, JSON in production
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_api=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to connect to Postgres"))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to run migrations"))?;

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    if bootstrap_admin(&repo, &config).await? {
        tracing::info!("admin account provisioned from ADMIN_EMAIL");
    }

    // 4. Object storage
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // MinIO in docker-compose starts without a bucket.
    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await?;
    }

    let storage = Arc::new(s3_client) as StorageState;

    // 5. Serve
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        config,
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
