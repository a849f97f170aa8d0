use std::sync::Arc;

use anyhow::Context;
use migration::{Migrator, MigratorTrait};

use signet_service::accounts::AccountService;
use signet_service::config::Config;
use signet_service::http::{router, AppState};
use signet_service::identity::IdentityResolver;
use signet_service::mail::{BrevoMailer, LogMailer, Mailer};
use signet_service::store::{CredentialStore, SeaOrmStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let store = SeaOrmStore::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    Migrator::up(store.connection(), None)
        .await
        .context("failed to run migrations")?;

    let mailer: Arc<dyn Mailer> = match config.mail.clone() {
        Some(mail) => Arc::new(BrevoMailer::new(mail)),
        None => Arc::new(LogMailer),
    };

    let store: Arc<dyn CredentialStore> = Arc::new(store);
    let accounts = Arc::new(AccountService::new(&config, store.clone(), mailer));
    let identity = IdentityResolver::new(accounts.codec().clone(), store);

    let app = router(AppState { accounts, identity });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
