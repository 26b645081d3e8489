use axum::{routing::get, Router};
use spothub::{auth, config::Config, db, index, notify::ChangeHub, profiles, spots, AppState};
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();

    let db_pool = db::connect(&config.database_url).await?;
    db::migrate(&db_pool).await?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(30)));

    let app_state = AppState {
        db_pool,
        clients: auth::Clients::load(&config.client_secret_path),
        changes: ChangeHub::new(config.change_buffer),
        capacity_policy: config.capacity_policy,
    };

    let app = Router::new()
        .route("/", get(index::my_spots))

        .merge(auth::router())
        .nest("/s", spots::router())
        .nest("/p", profiles::router())

        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
