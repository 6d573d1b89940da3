use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::body::parse_body;
use super::handlers;
use super::middleware::{
    csrf_protection, flash_messages, method_not_found, panic_response, render_error_pages,
    response_locals,
};
use super::static_files::serve_static;
use crate::auth::{attach_user, require_login, session_middleware};
use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route(
            "/add-product",
            get(handlers::admin::get_add_product).post(handlers::admin::post_add_product),
        )
        .route("/products", get(handlers::admin::get_products))
        .route("/edit-product/:id", get(handlers::admin::get_edit_product))
        .route("/edit-product", post(handlers::admin::post_edit_product))
        .route("/delete-product", post(handlers::admin::post_delete_product))
        .route("/product/:id", delete(handlers::admin::delete_product))
        .route_layer(middleware::from_fn(require_login));

    let shop_routes = Router::new()
        .route("/", get(handlers::shop::get_index))
        .route("/products", get(handlers::shop::get_products))
        .route("/products/:id", get(handlers::shop::get_product))
        .merge(
            Router::new()
                .route(
                    "/cart",
                    get(handlers::shop::get_cart).post(handlers::shop::post_cart),
                )
                .route("/cart-delete-item", post(handlers::shop::post_cart_delete_item))
                .route("/create-order", post(handlers::shop::post_create_order))
                .route("/orders", get(handlers::shop::get_orders))
                .route_layer(middleware::from_fn(require_login)),
        );

    let auth_routes = Router::new()
        .route(
            "/login",
            get(handlers::auth::get_login).post(handlers::auth::post_login),
        )
        .route(
            "/signup",
            get(handlers::auth::get_signup).post(handlers::auth::post_signup),
        )
        .route("/logout", post(handlers::auth::post_logout));

    let routes = Router::new()
        .nest("/admin", admin_routes)
        .merge(shop_routes)
        .merge(auth_routes)
        .route("/500", get(handlers::errors::get_500))
        .fallback(handlers::errors::not_found);

    with_pipeline(routes, state)
}

/// Wrap `routes` in the request pipeline and bind the state.
///
/// Stages run top to bottom on the way in:
/// request tracing, body limit, error pages, panic capture, body parsing,
/// static files, session, CSRF, flash, response locals, user attachment,
/// then the wrong-method check closest to the routes.
pub fn with_pipeline(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    let pipeline = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.web.body_limit))
        .layer(middleware::from_fn(render_error_pages))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(state.clone(), parse_body))
        .layer(middleware::from_fn_with_state(state.clone(), serve_static))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(middleware::from_fn(csrf_protection))
        .layer(middleware::from_fn(flash_messages))
        .layer(middleware::from_fn(response_locals))
        .layer(middleware::from_fn_with_state(state.clone(), attach_user))
        .layer(middleware::from_fn(method_not_found));

    routes.layer(pipeline).with_state(state)
}
