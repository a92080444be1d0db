//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::{DirectoryMode, EcaConfig};
use crate::error::ServiceError;
use eca_adapters::{
    build_http_client, AccountsClient, BotsClient, ClientCredentialsProvider, FixtureDirectory,
    ProjectsClient,
};
use eca_core::{
    BotDirectory, CacheConfig, CacheLayer, IdentityDirectory, ProjectDirectory, RequestValidator,
    TokenGuard,
};
use std::sync::Arc;
use tokio::net::TcpListener;

type Directories = (
    Arc<dyn IdentityDirectory>,
    Arc<dyn ProjectDirectory>,
    Arc<dyn BotDirectory>,
);

fn directories(config: &EcaConfig) -> Result<Directories, ServiceError> {
    match config.directory.mode {
        DirectoryMode::Fixture => {
            tracing::info!("using built-in fixture directories");
            let fixtures = Arc::new(FixtureDirectory::sample());
            let identities: Arc<dyn IdentityDirectory> = fixtures.clone();
            let projects: Arc<dyn ProjectDirectory> = fixtures.clone();
            let bots: Arc<dyn BotDirectory> = fixtures;
            Ok((identities, projects, bots))
        }
        DirectoryMode::Remote => {
            let directory = &config.directory;
            let http = build_http_client(directory.timeout())?;
            let tokens = Arc::new(TokenGuard::new(Arc::new(ClientCredentialsProvider::new(
                http.clone(),
                config.oauth.clone(),
            ))));
            tracing::info!(
                accounts = %directory.accounts_url,
                projects = %directory.projects_url,
                bots = %directory.bots_url,
                "using remote directories"
            );
            let identities: Arc<dyn IdentityDirectory> = Arc::new(AccountsClient::new(
                http.clone(),
                &directory.accounts_url,
                tokens,
            ));
            let projects: Arc<dyn ProjectDirectory> = Arc::new(ProjectsClient::new(
                http.clone(),
                &directory.projects_url,
                directory.page_size,
            ));
            let bots: Arc<dyn BotDirectory> = Arc::new(BotsClient::new(http, &directory.bots_url));
            Ok((identities, projects, bots))
        }
    }
}

/// Wire the cache, directories and validator described by `config`.
pub fn build_state(config: &EcaConfig) -> Result<AppState, ServiceError> {
    config.validate()?;
    let cache = Arc::new(CacheLayer::new(CacheConfig::from(&config.cache)));
    let (identities, projects, bots) = directories(config)?;
    let validator = RequestValidator::new(cache, identities, projects, bots, config.policy);
    Ok(AppState::new(Arc::new(validator)))
}

/// ECA validation server
pub struct Server {
    config: EcaConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: EcaConfig) -> Result<Self, ServiceError> {
        let state = build_state(&config)?;
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> Result<(), ServiceError> {
        let addr = self.config.server.listen_addr;

        // The first request should not pay for the paginated project listing.
        match self.state.validator.classifier().warm_up().await {
            Some(count) => tracing::info!(count, "project listing cached"),
            None => tracing::warn!("project warm-up failed, listing will load on first request"),
        }

        let app = create_router(self.state);
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            %addr,
            policy = ?self.config.policy,
            mode = ?self.config.directory.mode,
            "ecad listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("ecad shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
