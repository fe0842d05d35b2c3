pub mod api_v1;
pub mod live_handlers;

use actix_web::{web, HttpResponse};

use crate::errors::AppError;

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register every route. Shared between the server and the API tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .service(web::scope("/api/v1").configure(api_v1::configure))
    .route(
        "/ws/committees/{committee_id}/motions",
        web::get().to(live_handlers::motion_feed),
    );
}
