use auth_proto::auth_service_server::AuthServiceServer;
use auth_service::config::Config;
use auth_service::grpc::auth_service::AuthGrpcService;
use auth_service::grpc::policy::PolicyTable;
use auth_service::grpc::request_gate::RequestGateLayer;
use auth_service::repositories::users::{PgUserRepository, UserRepository};
use auth_service::services::credential_issuer::CredentialIssuer;
use auth_service::services::credential_verifier::CredentialVerifier;
use auth_service::services::login_service::LoginService;
use auth_service::services::session_rotator::SessionRotator;
use auth_service::services::user_service::UserService;
use auth_service::services::TokenSettings;
use auth_service::store::{RedisSessionStore, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Auth Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.context_timeout)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    info!("Connecting to session store...");
    let store: Arc<dyn SessionStore> = Arc::new(
        RedisSessionStore::connect(&config.cache_url())
            .await
            .map_err(|e| {
                error!("Failed to connect to session store: {}", e);
                e
            })?,
    );

    info!("Session store connection established");

    let settings = Arc::new(TokenSettings::from_config(&config));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db_pool));

    let issuer = CredentialIssuer::new(Arc::clone(&store), Arc::clone(&settings));
    let verifier = CredentialVerifier::new(Arc::clone(&store), Arc::clone(&settings));

    let login = LoginService::new(
        Arc::clone(&users),
        issuer.clone(),
        verifier.clone(),
        Arc::clone(&store),
        Arc::clone(&settings),
    );
    let rotator = SessionRotator::new(
        verifier.clone(),
        issuer,
        Arc::clone(&users),
        Arc::clone(&store),
        Arc::clone(&settings),
    );
    let user_service = UserService::new(users, Arc::clone(&settings), config.bcrypt_cost);

    let policies = Arc::new(PolicyTable::auth_service()?);
    info!(restricted_operations = policies.len(), "Access policy loaded");

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Auth Service listening on {}", addr);

    tonic::transport::Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .layer(RequestGateLayer::new(policies, verifier))
        .add_service(AuthServiceServer::new(AuthGrpcService::new(
            login,
            rotator,
            user_service,
        )))
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("Auth Service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received");
}
