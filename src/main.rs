use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tessera_server::config::Config;
use tessera_server::routes::create_routes;
use tessera_server::services::{
    LogNotifier, Notifier, PricingConfig, SmtpNotifier, SystemClock, TicketingService,
    UuidReferences,
};
use tessera_server::store::PgStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let store = PgStore::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    store.migrate().await.expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            Arc::new(SmtpNotifier::from_config(smtp).expect("Invalid SMTP configuration"))
        }
        None => {
            tracing::info!("SMTP not configured, email runs in simulation mode");
            Arc::new(LogNotifier)
        }
    };

    let service = TicketingService::new(
        Arc::new(store),
        Arc::new(SystemClock),
        Arc::new(UuidReferences),
        notifier,
        PricingConfig {
            tax_rate: config.tax_rate,
            currency: config.currency.clone(),
        },
        config.app_name.clone(),
    );

    service
        .seed_initial_data()
        .await
        .expect("Failed to seed initial data");

    let app = create_routes(service, &config.cors_allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
