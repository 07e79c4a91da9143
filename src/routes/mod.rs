// Route exports
pub mod rankings;

use actix_web::web;

pub use rankings::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(rankings::configure),
    );
}
