//! Sharehub server entry point.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{Router, middleware};
use sharehub_api::{AppState, middleware::auth_middleware, router as api_router};
use sharehub_common::{Config, VotingConfig};
use sharehub_core::{
    CommentService, DbVoteLedger, ImpactPolicy, UploadService, UserService, VotableRegistry,
    VotingService,
};
use sharehub_db::repositories::{
    CommentRepository, UploadRepository, UserRepository, VoteRepository,
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Register every votable entity type with its configured impact policy.
fn build_registry(
    upload_repo: &UploadRepository,
    comment_repo: &CommentRepository,
    voting: &VotingConfig,
) -> anyhow::Result<VotableRegistry> {
    let registry = VotableRegistry::builder()
        .register(
            Arc::new(upload_repo.clone()),
            ImpactPolicy::from_range(&voting.upload_impact),
        )?
        .register(
            Arc::new(comment_repo.clone()),
            ImpactPolicy::from_range(&voting.comment_impact),
        )?
        .build();

    info!(types = ?registry.type_tags(), "Votable types registered");
    Ok(registry)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sharehub=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting sharehub server...");

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Connect to database
    let db = Arc::new(sharehub_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    sharehub_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let upload_repo = UploadRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));

    // Initialize services
    let registry = build_registry(&upload_repo, &comment_repo, &config.voting)?;
    let voting_service = VotingService::with_config(
        Arc::new(DbVoteLedger::new(vote_repo)),
        registry,
        &config.voting,
    );
    let user_service = UserService::new(
        user_repo,
        upload_repo.clone(),
        comment_repo.clone(),
        voting_service.clone(),
    );
    let upload_service = UploadService::new(
        upload_repo.clone(),
        comment_repo.clone(),
        voting_service.clone(),
    );
    let comment_service = CommentService::new(comment_repo, upload_repo, voting_service.clone());

    let state = AppState {
        user_service,
        upload_service,
        comment_service,
        voting_service,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.host))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
