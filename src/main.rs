//! Blogicum - a server-rendered blog

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blogicum::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository,
            SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
        },
    },
    services::{
        CategoryService, CommentService, ImageStore, LocationService, PostService, UserService,
    },
    theme::ThemeEngine,
};

/// Config file used when `BLOGICUM_CONFIG` is not set
const DEFAULT_CONFIG: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogicum=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Blogicum...");

    // Load configuration
    let config_path = std::env::var("BLOGICUM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));
    let config = Config::load_with_env(&config_path)?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    pool.ping().await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let location_repo = SqlxLocationRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::with_session_expiration(
        user_repo,
        session_repo,
        config.session.expiration_days,
    ));
    let post_service = Arc::new(PostService::new(
        post_repo.clone(),
        category_repo.clone(),
        location_repo.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(comment_repo, post_repo));
    let category_service = Arc::new(CategoryService::new(category_repo));
    let location_service = Arc::new(LocationService::new(location_repo));

    // Initialize theme engine
    let theme_engine = ThemeEngine::new(&config.theme.path, &config.theme.active)?;
    tracing::info!("Theme engine initialized: {}", config.theme.active);

    let image_store = ImageStore::new(config.upload.clone());
    tracing::info!("Serving media from {}", image_store.media_root().display());

    let state = AppState {
        user_service: user_service.clone(),
        post_service,
        comment_service,
        category_service,
        location_service,
        theme_engine: Arc::new(theme_engine),
        image_store: Arc::new(image_store),
        site: Arc::new(config.site.clone()),
        session: Arc::new(config.session.clone()),
    };

    // Expired sessions are purged periodically
    {
        let user_service = user_service.clone();
        let period = tokio::time::Duration::from_secs(config.session.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!("Removed {} expired sessions", removed),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
