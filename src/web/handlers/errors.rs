use axum::response::Response;

use crate::web::middleware::ViewLocals;
use crate::web::views;

/// `GET /500`
pub async fn get_500(locals: ViewLocals) -> Response {
    views::server_error(locals.is_authenticated)
}

/// Fallback for every unmatched route
pub async fn not_found(locals: ViewLocals) -> Response {
    views::not_found(&locals)
}
