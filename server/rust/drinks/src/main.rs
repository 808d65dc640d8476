use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use coffee_auth::JwksVerifier;
use coffee_drinks_server::adapter::handler::{self, AppState};
use coffee_drinks_server::adapter::repository::{DrinkPostgresRepository, InMemoryDrinkRepository};
use coffee_drinks_server::domain::repository::DrinkRepository;
use coffee_drinks_server::infrastructure::config::Config;
use coffee_drinks_server::infrastructure::database;
use coffee_telemetry::{Metrics, MetricsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // Telemetry
    coffee_telemetry::init_telemetry(&cfg.telemetry_config())?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        issuer = %cfg.auth.issuer(),
        audience = %cfg.auth.audience,
        "starting drinks server"
    );

    // Database pool (optional)
    let db_pool = if let Some(options) = cfg.database_options()? {
        let pool = database::create_pool(options, cfg.max_connections()).await?;
        info!("database connection pool established");
        database::run_migrations(&pool).await?;
        info!("database migrations applied");
        if cfg.reset_on_startup() {
            warn!("reset_on_startup is enabled, dropping all drinks");
            database::reset_and_seed(&pool).await?;
        }
        Some(pool)
    } else {
        info!("no database configured, using in-memory repository");
        None
    };

    let drink_repo: Arc<dyn DrinkRepository> = match db_pool {
        Some(ref pool) => Arc::new(DrinkPostgresRepository::new(pool.clone())),
        None => Arc::new(InMemoryDrinkRepository::new()),
    };

    // Auth
    let verifier = Arc::new(JwksVerifier::from_config(&cfg.auth)?);

    // Metrics
    let metrics = Arc::new(Metrics::new(&cfg.app.name)?);

    let state = AppState::new(drink_repo, verifier, metrics.clone());
    let app = handler::router(state).layer(MetricsLayer::new(metrics));

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!("REST server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = db_pool {
        pool.close().await;
    }
    coffee_telemetry::shutdown();
    info!("drinks server exited");

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
