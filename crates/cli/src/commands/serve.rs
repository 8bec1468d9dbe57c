use anyhow::{Context, Result};
use landing_kit_core::ServerConfig;
use landing_kit_deployer::firebase::{FirebaseAuth, FirebaseHostingClient, ServiceAccount};
use landing_kit_deployer::netlify::{NetlifyApi, NetlifyClient};
use landing_kit_generator::{GeminiClient, GenerationError, TextGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::server::{self, AppState};

/// Start the API server.
///
/// Missing provider credentials never stop startup: the affected route
/// answers with a configuration error instead. Firebase credentials are
/// checked in the background so the listener comes up immediately.
pub async fn run(host: Option<String>, port: Option<u16>, config_path: Option<PathBuf>) -> Result<()> {
    let mut config =
        ServerConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let (state, service_account) = build_state(&config)?;

    if let Some(account) = service_account {
        let auth = state.firebase_auth.clone();
        let timeout = Duration::from_secs(config.request_timeout_secs);
        tokio::spawn(async move {
            auth.initialize(account, timeout).await;
        });
    }

    let app = server::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, origins = ?config.allowed_origins, "landing-kit API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Wire the configured clients into an [`AppState`].
///
/// Returns the parsed service account alongside, still to be verified by
/// [`FirebaseAuth::initialize`].
pub fn build_state(config: &ServerConfig) -> Result<(AppState, Option<ServiceAccount>)> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let generator: Option<Arc<dyn TextGenerator>> =
        match GeminiClient::new(&config.gemini, timeout) {
            Ok(client) => {
                tracing::info!(model = %client.model(), "Gemini client ready");
                Some(Arc::new(client))
            }
            Err(GenerationError::NotConfigured(reason)) => {
                tracing::warn!(%reason, "GEMINI_API_KEY not set; /api/generate and /api/edit are disabled");
                None
            }
            Err(e) => return Err(e).context("Failed to build Gemini client"),
        };

    let netlify: Option<Arc<dyn NetlifyApi>> = match config.netlify.access_token.as_deref() {
        Some(token) => match NetlifyClient::new(
            token,
            config.netlify.account_slug.clone(),
            &config.netlify.api_base,
            timeout,
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NETLIFY_ACCESS_TOKEN rejected; /api/deploy is disabled");
                None
            }
        },
        None => {
            tracing::warn!("NETLIFY_ACCESS_TOKEN not set; /api/deploy is disabled");
            None
        }
    };

    let hosting = FirebaseHostingClient::new(&config.firebase.api_base, timeout)
        .context("Failed to build Firebase Hosting client")?;

    let firebase_auth = FirebaseAuth::new();
    let mut firebase_project = config.firebase.project_id.clone();
    let service_account = match config.firebase.service_account_json.as_deref() {
        Some(json) => match ServiceAccount::from_json(json) {
            Ok(account) => {
                if firebase_project.is_none() {
                    firebase_project = account.project_id.clone();
                }
                Some(account)
            }
            Err(e) => {
                tracing::error!(error = %e, "FIREBASE_SERVICE_ACCOUNT_JSON could not be parsed");
                firebase_auth.mark_failed(e.to_string());
                None
            }
        },
        None => {
            tracing::warn!("FIREBASE_SERVICE_ACCOUNT_JSON not set; /api/deploy-firebase is disabled");
            firebase_auth.mark_failed("FIREBASE_SERVICE_ACCOUNT_JSON is not set");
            None
        }
    };

    let state = AppState {
        generator,
        netlify,
        hosting: Arc::new(hosting),
        firebase_auth,
        firebase_project,
        allowed_origins: Arc::new(config.allowed_origins.clone()),
    };

    Ok((state, service_account))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
