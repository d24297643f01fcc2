use red_drop_api::{
    AppState,
    auth::{FirebaseVerifier, SharedSecretVerifier, VerifierState},
    config::{AppConfig, Env, IdentityConfig},
    create_router,
    payment::{PaymentState, StripeClient},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects the document store and builds the
/// identity verifier and payment client before serving the router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration. Any missing credential aborts startup.
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging: pretty locally, JSON in production.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "red_drop_api=debug,tower_http=info".into());

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

    // 3. Document store.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await?;
    let postgres = PostgresRepository::new(pool);
    postgres.ensure_schema().await?;
    let repo = Arc::new(postgres) as RepositoryState;

    // 4. Identity verifier for the selected environment.
    let verifier: VerifierState = match &config.identity {
        IdentityConfig::Firebase { project_id } => {
            tracing::info!(%project_id, "verifying Firebase ID tokens");
            Arc::new(FirebaseVerifier::new(project_id.clone()))
        }
        IdentityConfig::SharedSecret(secret) => {
            tracing::warn!("verifying locally signed HS256 tokens; not for production");
            Arc::new(SharedSecretVerifier::new(secret))
        }
    };

    // 5. Payment provider.
    let payments = Arc::new(StripeClient::new(&config.stripe_secret)) as PaymentState;

    // 6. State and router.
    let port = config.port;
    let app = create_router(AppState::new(repo, verifier, payments, config));

    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address).await?;

    tracing::info!("Listening on {address}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
