use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use scheduler_cell::state::AppState;
use shared_config::AppConfig;
use shared_store::{MemoryStore, PostgrestStore, SchedulingStore};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn SchedulingStore> = if config.is_postgrest_configured() {
        Arc::new(PostgrestStore::new(&config))
    } else {
        warn!("No PostgREST backend configured, using in-memory store");
        Arc::new(MemoryStore::new())
    };

    let state = AppState::new(Arc::clone(&config), store);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.bind_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
