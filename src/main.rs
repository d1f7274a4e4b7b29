mod api_doc;
mod auth;
mod cache;
mod config;
mod db;
mod event;
mod notification;
mod realtime;
mod routes;
mod schema_ext;
mod social;
mod websocket;

use axum::{routing::get, Router};
use dotenv::dotenv;
use redis::Client;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::cache::redis::RedisCache;
use crate::config::AppConfig;
use crate::event::source::EventSource;
use crate::notification::service::NotificationService;
use crate::notification::store::PgNotificationStore;
use crate::realtime::dispatcher::BroadcastDispatcher;
use crate::realtime::gateway::RealtimeGateway;
use crate::realtime::router::TopicRouter;
use crate::social::service::SocialService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    tracing_subscriber::fmt::init();

    // Load .env file if it exists
    dotenv().ok();

    let app_config = AppConfig::from_env()?;

    // Create connection pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&app_config.database_url)
        .await?;

    // Check if the database is initialized
    if !db::check_db_initialized(&pool).await {
        db::init_db(&pool).await?;
    }

    // Initialize Redis cache if configured
    let redis_cache = if let Some(url) = &app_config.redis_url {
        info!("Initializing Redis cache with URL: {}", url);
        match Client::open(url.clone()) {
            Ok(client) => Some(RedisCache::new(client)),
            Err(e) => {
                error!("Failed to connect to Redis: {}", e);
                None
            }
        }
    } else {
        info!("No Redis URL configured, proceeding without cache");
        None
    };

    // The single long-lived gateway instance every publisher shares
    let gateway = Arc::new(RealtimeGateway::new(app_config.connection_buffer_capacity));

    // Broadcast pipeline: router resolves payloads at dispatch time, the
    // dispatcher drains a bounded queue in the background
    let topic_router = Arc::new(TopicRouter::new(pool.clone()));
    let dispatcher = BroadcastDispatcher::start(
        topic_router,
        gateway.clone(),
        app_config.dispatch_queue_capacity,
    );

    // Create service instances
    let notification_service = Arc::new(NotificationService::new(
        Arc::new(PgNotificationStore::new(pool.clone())),
        dispatcher,
        redis_cache,
    ));
    let event_source = Arc::new(EventSource::new(
        notification_service.clone(),
        app_config.notify_on_unfollow,
    ));
    let social_service = Arc::new(SocialService::new(pool.clone(), event_source));

    // Build the router
    let app = Router::new()
        // API documentation
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Health routes
        .merge(routes::health::routes(pool.clone()))
        // Notification REST + realtime routes
        .merge(routes::notifications::routes(
            notification_service.clone(),
            gateway.clone(),
        ))
        // Social write routes
        .merge(routes::social::routes(social_service.clone()))
        // Welcome route
        .route(
            "/",
            get(|| async { "Welcome to Realtime Social Backend API" }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Server starting at http://{}", app_config.bind_addr);
    info!(
        "WebSocket notifications: ws://{}/api/notifications/ws?token=<JWT>",
        app_config.bind_addr
    );

    axum::Server::bind(&app_config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
