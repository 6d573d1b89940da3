use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{CurrentUser, Flash};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::web::body::FormBody;
use crate::web::middleware::ViewLocals;
use crate::web::views::{self, Page};

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    page: Option<String>,
}

pub async fn get_index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
    locals: ViewLocals,
) -> Result<Html<String>> {
    let page_number = query
        .page
        .as_deref()
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1);
    let listing = state.products.page(page_number).await?;

    let page = Page::new("Shop", "/", &locals);
    Ok(Html(views::shop_index(&page, &listing)))
}

pub async fn get_products(
    State(state): State<Arc<AppState>>,
    locals: ViewLocals,
) -> Result<Html<String>> {
    let products = state.products.list().await?;
    let page = Page::new("All Products", "/products", &locals);
    Ok(Html(views::product_list(&page, &products)))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    locals: ViewLocals,
) -> Result<Html<String>> {
    let product = state
        .products
        .get(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

    let page = Page::new(&product.title, "/products", &locals);
    Ok(Html(views::product_detail(&page, &product)))
}

pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    locals: ViewLocals,
) -> Result<Html<String>> {
    let lines = state.carts.lines(&user.id).await?;
    let message = flash.take_one("error");
    let page = Page::new("Your Cart", "/cart", &locals);
    Ok(Html(views::cart(&page, message.as_deref(), &lines)))
}

pub async fn post_cart(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    form: FormBody,
) -> Result<Redirect> {
    let product_id = form.text("productId");
    if state.products.get(&product_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Product {}", product_id)));
    }

    state.carts.add(&user.id, &product_id).await?;
    Ok(Redirect::to("/cart"))
}

pub async fn post_cart_delete_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    form: FormBody,
) -> Result<Redirect> {
    state.carts.remove(&user.id, &form.text("productId")).await?;
    Ok(Redirect::to("/cart"))
}

pub async fn post_create_order(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Result<Response> {
    let lines = state.carts.lines(&user.id).await?;
    if lines.is_empty() {
        flash.push("error", "Your cart is empty.");
        return Ok(Redirect::to("/cart").into_response());
    }

    state.orders.create(&user, &lines).await?;
    state.carts.clear(&user.id).await?;
    Ok(Redirect::to("/orders").into_response())
}

pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    locals: ViewLocals,
) -> Result<Html<String>> {
    let orders = state.orders.list_for_user(&user.id).await?;
    let page = Page::new("Your Orders", "/orders", &locals);
    Ok(Html(views::orders(&page, &orders)))
}
