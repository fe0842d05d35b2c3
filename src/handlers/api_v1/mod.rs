pub mod committees;
pub mod motions;
pub mod replies;
pub mod votes;

use actix_web::{
    web, Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use crate::responses::ApiErrorResponse;

/// Rejects POST/PUT/DELETE requests without `Content-Type: application/json`.
/// A cross-origin form post cannot set that header, so mutations cannot be
/// forged from another site. GET requests are exempt.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
                details: None,
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure API v1 routes. Fixed motion sub-routes are registered before
/// the `{action}` catch-all.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/committees")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("", web::get().to(committees::list))
            .route("", web::post().to(committees::create))
            .route("/{cid}", web::get().to(committees::read))
            .route("/{cid}", web::delete().to(committees::delete))
            .route("/{cid}/settings", web::put().to(committees::update_settings))
            .route("/{cid}/members", web::post().to(committees::add_member))
            .route("/{cid}/members/{uid}", web::put().to(committees::set_member_role))
            .route("/{cid}/members/{uid}", web::delete().to(committees::remove_member))
            .route("/{cid}/motions", web::get().to(motions::list))
            .route("/{cid}/motions", web::post().to(motions::create))
            .route("/{cid}/motions/{mid}", web::get().to(motions::read))
            .route("/{cid}/motions/{mid}", web::delete().to(motions::delete))
            .route("/{cid}/motions/{mid}/second", web::post().to(motions::second))
            .route("/{cid}/motions/{mid}/votes", web::get().to(votes::list))
            .route("/{cid}/motions/{mid}/votes", web::post().to(votes::cast))
            .route("/{cid}/motions/{mid}/votes/me", web::get().to(votes::mine))
            .route("/{cid}/motions/{mid}/replies", web::get().to(replies::list))
            .route("/{cid}/motions/{mid}/replies", web::post().to(replies::create))
            .route("/{cid}/motions/{mid}/{action}", web::post().to(motions::act)),
    );
}
