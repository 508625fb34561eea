use serde::Deserialize;
use socium_api::server::{self, ServerState};
use socium_common::{
    model::{account::EmailAddress, auth::Password},
    snowflake::{WorkerId, WorkerIdOutOfRangeError},
    util::PositiveDuration,
};
use socium_db::{DbClient, DbError, Gateway, MemoryStore};
use socium_service::{
    Service, ServiceError,
    outbox::{LogMailer, Outbox},
    token::TokenKeys,
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("TOKEN_LIFETIME_HOURS must be positive")]
    TokenLifetime,
    #[error(transparent)]
    WorkerId(#[from] WorkerIdOutOfRangeError),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error creating the admin account: {0}")]
    Admin(#[from] ServiceError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    /// Without a database everything is kept in memory.
    database_url: Option<String>,
    jwt_secret: String,
    #[serde(default = "default_token_lifetime_hours")]
    token_lifetime_hours: u32,
    public_url: String,
    #[serde(default)]
    worker_id: u16,
    admin_email: Option<EmailAddress>,
    admin_password: Option<String>,
}

fn default_token_lifetime_hours() -> u32 {
    24
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "socium_api=debug,\
                socium_service=debug,\
                socium_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .env file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

/// Cancels `shutdown` on ctrl-c.
async fn watch_ctrl_c(shutdown: CancellationToken) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "Could not listen for ctrl-c");
        return;
    }

    info!("Shutting down");
    shutdown.cancel();
}

async fn serve<G: Gateway>(gateway: G, env: Env) -> Result<(), InitError> {
    let worker_id = WorkerId::try_from(env.worker_id)?;
    let lifetime =
        PositiveDuration::from_hours(env.token_lifetime_hours).ok_or(InitError::TokenLifetime)?;
    let tokens = Arc::new(TokenKeys::from_secret(env.jwt_secret.as_bytes(), lifetime));

    let (outbox, outbox_receiver) = Outbox::channel();
    let service = Arc::new(Service::new(
        gateway,
        worker_id,
        tokens,
        outbox,
        env.public_url,
    ));

    match (env.admin_email, env.admin_password) {
        (Some(email), Some(password)) => {
            service
                .ensure_admin("Admin", "Admin", email, &Password::new(password))
                .await?;
        }
        (None, None) => {}
        _ => warn!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together, skipping admin setup"),
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(shutdown.clone()));
    let dispatcher = tokio::spawn(outbox_receiver.dispatch(LogMailer, shutdown.clone()));

    let app = server::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState::new(service));

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .map_err(InitError::TcpServe);

    shutdown.cancel();
    if let Err(error) = dispatcher.await {
        error!(%error, "Mail dispatcher panicked");
    }

    served
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    match env.database_url.clone() {
        Some(database_url) => {
            let client = DbClient::connect(&database_url).await?;
            client.migrate().await?;
            serve(client, env).await
        }
        None => {
            warn!("DATABASE_URL is not set, data will not survive a restart");
            serve(MemoryStore::new(), env).await
        }
    }
}
