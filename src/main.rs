use std::io;

use actix_web::{middleware, web, App, HttpServer};
use envconfig::Envconfig;
use log::info;

use group_scrape::{handlers, AppState, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env file: {}", e);
        }
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::init_from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let state = AppState::from_config(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let state = web::Data::new(state);

    let bind = config.bind();
    info!("Server running on http://{}", bind);
    info!("API endpoints:");
    info!("  POST /api/trigger                     - Trigger data collection");
    info!("  GET  /api/progress/:snapshotId        - Check collection status");
    info!("  GET  /api/snapshots                   - Get snapshots list");
    info!("  GET  /api/snapshot/:snapshotId        - Download snapshot");
    info!("  POST /api/snapshot/:snapshotId/cancel - Cancel snapshot");
    info!("  POST /webhook                         - Webhook endpoint");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(handlers::cors_headers())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
            .default_service(web::route().to(handlers::fallback))
    })
    .bind(bind)?
    .run()
    .await
}
