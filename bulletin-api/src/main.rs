use bulletin_common::model::auth::TokenKeys;
use bulletin_db::{
    backend::StoreBackend,
    client::DbClient,
    memory::MemoryStore,
    store::DbError,
};
use serde::Deserialize;
use server::ServerState;
use service::ContentService;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use storage::DiskImageStorage;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;
mod service;
mod storage;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error preparing database: {0}")]
    Database(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: Option<String>,
    jwt_secret: String,
    #[serde(default = "default_image_dir")]
    image_dir: PathBuf,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bulletin_api=debug,\
                bulletin_common=debug,\
                bulletin_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn open_store(database_url: Option<&str>) -> Result<StoreBackend, InitError> {
    let Some(database_url) = database_url else {
        warn!("DATABASE_URL is not set, data is kept in memory only");
        return Ok(StoreBackend::Memory(MemoryStore::default()));
    };

    let client = DbClient::connect(database_url).await?;
    client.migrate().await?;

    Ok(StoreBackend::Postgres(client))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Listening for shutdown signal failed");
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let store = open_store(env.database_url.as_deref()).await?;
    let images = DiskImageStorage::new(env.image_dir);
    let tokens = TokenKeys::from_secret(&env.jwt_secret);

    let service = ContentService::new(store, images.clone(), tokens);
    let app = server::app(ServerState::new(service, images));

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
