use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};

use motionhall::config::AppConfig;
use motionhall::store::{DocumentStore, MemoryStore, PgStore};
use motionhall::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("Failed to connect to PostgreSQL");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            let store = PgStore::from_pool(pool, config.tx_max_attempts)
                .await
                .expect("Failed to start PostgreSQL change listener");
            log::info!("Using PostgreSQL document store");
            Arc::new(store)
        }
        None => {
            log::warn!("No DATABASE_URL set, using in-memory store (data lost on restart)");
            Arc::new(MemoryStore::with_max_attempts(config.tx_max_attempts))
        }
    };
    let store: web::Data<dyn DocumentStore> = web::Data::from(store);

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(store.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
