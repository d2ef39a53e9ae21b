//! StarSling server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use starsling_lib::api;
use starsling_lib::auth::SessionKey;
use starsling_lib::config::{Config, QueueBackend};
use starsling_lib::db::DbPool;
use starsling_lib::middleware::RequestLogger;
use starsling_lib::services::{
    EventDispatcher, EventHandlers, EventQueue, GitHubAppClient, InMemoryQueue, InngestQueue,
    RetryPolicy, TokenCipher, start_event_worker,
};

/// Exit after logging a fatal startup error.
fn fatal(context: &str, err: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, err);
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, STARSLING_SESSION_SECRET and ENCRYPTION_KEY must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  StarSling Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }
    config.log_missing_keys();

    // Initialize database
    let pool = DbPool::connect(&config.database.url, config.database.max_connections)
        .await
        .unwrap_or_else(|e| fatal("Failed to connect to database", e));
    info!("Database connection established");

    pool.run_migrations()
        .await
        .unwrap_or_else(|e| fatal("Failed to run migrations", e));

    // Event queue: hosted queue in production, in-process worker otherwise
    let handlers = EventHandlers::new(pool.clone());
    let queue: Arc<dyn EventQueue> = match config.event_queue.backend {
        QueueBackend::Inngest => Arc::new(
            InngestQueue::new(&config.event_queue)
                .unwrap_or_else(|e| fatal("Failed to initialize event queue", e)),
        ),
        QueueBackend::Memory => {
            let queue = InMemoryQueue::new();
            start_event_worker(queue.subscribe(), handlers.clone(), RetryPolicy::default());
            Arc::new(queue)
        }
    };
    info!(backend = queue.backend(), "Event queue ready");
    let dispatcher = EventDispatcher::new(queue);

    let github = GitHubAppClient::new(&config.github_app)
        .unwrap_or_else(|e| fatal("Failed to build GitHub client", e));
    let cipher = TokenCipher::new(config.encryption_key.clone());
    let session_key = SessionKey::new(config.session.secret.clone(), config.session.ttl_secs);

    // Prepare shared state
    let bind_address = config.bind_address();
    let is_development = config.is_development();
    let app_url = config.app_url.clone();

    let config = web::Data::new(config);
    let pool = web::Data::new(pool);
    let handlers = web::Data::new(handlers);
    let dispatcher = web::Data::new(dispatcher);
    let github = web::Data::new(github);
    let cipher = web::Data::new(cipher);
    let session_key = web::Data::new(session_key);

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    // Start HTTP server
    let server = HttpServer::new(move || {
        // The UI is served from its own origin and sends the session cookie
        let cors = Cors::default()
            .allowed_origin(&app_url)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            // Add CORS middleware (must be before other middleware)
            .wrap(cors)
            // Add request logging middleware
            .wrap(RequestLogger)
            // Add shared state
            .app_data(config.clone())
            .app_data(pool.clone())
            .app_data(handlers.clone())
            .app_data(dispatcher.clone())
            .app_data(github.clone())
            .app_data(cipher.clone())
            .app_data(session_key.clone())
            // Configure API routes
            .service(web::scope("/api/v1").configure(api::configure_routes));

        if is_development {
            app = app.service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
            );
        }

        app
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
