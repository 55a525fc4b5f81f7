use anyhow::Context;
use axum::{routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use checkin::config::{self, AppConfig};
use checkin::db::PgStore;
use checkin::keystore::RedisKeyStore;
use checkin::notify::FileAttachmentProvider;
use checkin::AppServices;

async fn root() -> &'static str {
    "Event Check-in API"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    // Invalid auth settings abort startup before anything is bound.
    let app_config = AppConfig::from_env().context("invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&app_config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    if let Err(error) = sqlx::migrate!().run(&pool).await {
        if *config::ALLOW_MIGRATION_FAILURE {
            tracing::warn!(
                ?error,
                "Database migrations failed but continuing due to ALLOW_MIGRATION_FAILURE"
            );
        } else {
            return Err(error).context("database migrations failed");
        }
    }

    let keystore = Arc::new(
        RedisKeyStore::open(&app_config.redis_url)
            .await
            .context("failed to open key store")?,
    );
    let store = Arc::new(PgStore::new(pool.clone()));
    let attachments = Arc::new(FileAttachmentProvider::new(app_config.qr_asset_dir.clone()));
    let services = AppServices::new(
        &app_config.auth,
        app_config.dispatch.clone(),
        store,
        keystore.clone(),
        attachments,
    )
    .context("failed to build notification dispatcher")?
    .with_database(PgStore::new(pool));

    match services.keys.bootstrap().await {
        Ok(created) if !created.is_empty() => {
            tracing::info!(roles = ?created, "bootstrapped missing role keys")
        }
        Ok(_) => {}
        Err(error) => tracing::warn!(%error, "role key bootstrap failed; requests will fail closed"),
    }

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let app = Router::new()
        .route("/", get(root))
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .merge(checkin::app(services))
        .layer(prometheus_layer);

    let addr: SocketAddr = format!("{}:{}", config::BIND_ADDRESS.as_str(), *config::BIND_PORT)
        .parse()
        .context("invalid bind address")?;
    tracing::info!(%addr, "Listening for incoming connections");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    keystore.close().await;
    tracing::info!("key store connection closed");
    Ok(())
}
