// src/handlers/index.rs
use actix_web::HttpResponse;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().content_type("application/json").body("{\"status\": \"ok\"}")
}
