use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::validation_message;
use crate::auth::{CurrentUser, Flash};
use crate::error::{AppError, Result};
use crate::shop::ProductInput;
use crate::state::AppState;
use crate::upload::UploadedFile;
use crate::web::body::FormBody;
use crate::web::middleware::ViewLocals;
use crate::web::views::{self, Page, ProductFormValues};

#[derive(Debug, Validate)]
struct ProductForm {
    #[validate(length(min = 3, message = "Title must be at least 3 characters long."))]
    title: String,
    #[validate(range(min = 0.01, message = "Price must be a positive number."))]
    price: f64,
    #[validate(length(
        min = 5,
        max = 400,
        message = "Description must be between 5 and 400 characters."
    ))]
    description: String,
}

impl ProductForm {
    fn from_body(form: &FormBody) -> Self {
        Self {
            title: form.text("title").trim().to_string(),
            // Unparseable prices fail the range rule
            price: form.text("price").trim().parse().unwrap_or(-1.0),
            description: form.text("description").trim().to_string(),
        }
    }

    fn input(&self) -> ProductInput {
        ProductInput {
            title: self.title.clone(),
            price: self.price,
            description: self.description.clone(),
        }
    }
}

fn form_values(form: &FormBody, id: Option<String>) -> ProductFormValues {
    ProductFormValues {
        id,
        title: form.text("title"),
        price: form.text("price"),
        description: form.text("description"),
    }
}

fn render_form(
    locals: &ViewLocals,
    status: StatusCode,
    message: Option<&str>,
    values: &ProductFormValues,
) -> Response {
    let (title, path) = if values.id.is_some() {
        ("Edit Product", "/admin/edit-product")
    } else {
        ("Add Product", "/admin/add-product")
    };
    let page = Page::new(title, path, locals);
    (status, Html(views::product_form(&page, message, values))).into_response()
}

pub async fn get_add_product(locals: ViewLocals) -> Response {
    render_form(&locals, StatusCode::OK, None, &ProductFormValues::default())
}

pub async fn post_add_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    locals: ViewLocals,
    form: FormBody,
    image: Option<Extension<UploadedFile>>,
) -> Result<Response> {
    let product = ProductForm::from_body(&form);
    let values = form_values(&form, None);

    let Some(Extension(image)) = image else {
        return Ok(render_form(
            &locals,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("Attached file is not an image."),
            &values,
        ));
    };

    if let Err(errors) = product.validate() {
        state.images.remove(&image.url()).await;
        let message = validation_message(&errors, &["title", "price", "description"]);
        return Ok(render_form(
            &locals,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(&message),
            &values,
        ));
    }

    state
        .products
        .create(&user.id, &product.input(), &image.url())
        .await?;
    Ok(Redirect::to("/admin/products").into_response())
}

pub async fn get_products(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    locals: ViewLocals,
) -> Result<Html<String>> {
    let products = state.products.list_by_user(&user.id).await?;
    let page = Page::new("Admin Products", "/admin/products", &locals);
    Ok(Html(views::admin_products(&page, &products)))
}

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    edit: Option<String>,
}

pub async fn get_edit_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
    Query(query): Query<EditQuery>,
    flash: Flash,
    locals: ViewLocals,
) -> Result<Response> {
    if query.edit.as_deref() != Some("true") {
        return Ok(Redirect::to("/").into_response());
    }

    let product = match state.products.get(&product_id).await? {
        Some(product) if product.user_id == user.id => product,
        _ => return Ok(Redirect::to("/").into_response()),
    };

    let message = flash.take_one("error");
    Ok(render_form(
        &locals,
        StatusCode::OK,
        message.as_deref(),
        &ProductFormValues::from(&product),
    ))
}

pub async fn post_edit_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    locals: ViewLocals,
    form: FormBody,
    image: Option<Extension<UploadedFile>>,
) -> Result<Response> {
    let product_id = form.text("productId");
    let product = ProductForm::from_body(&form);
    let image = image.map(|Extension(file)| file);

    if let Err(errors) = product.validate() {
        if let Some(file) = &image {
            state.images.remove(&file.url()).await;
        }
        let message = validation_message(&errors, &["title", "price", "description"]);
        return Ok(render_form(
            &locals,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(&message),
            &form_values(&form, Some(product_id)),
        ));
    }

    let new_url = image.as_ref().map(UploadedFile::url);
    let previous = match state
        .products
        .update(&product_id, &user.id, &product.input(), new_url.as_deref())
        .await
    {
        Ok(previous) => previous,
        Err(e @ (AppError::Forbidden(_) | AppError::NotFound(_))) => {
            tracing::warn!("Edit of product {} refused: {}", product_id, e);
            if let Some(url) = &new_url {
                state.images.remove(url).await;
            }
            flash.push("error", "You cannot edit this product.");
            return Ok(Redirect::to("/").into_response());
        }
        Err(e) => return Err(e),
    };

    if new_url.is_some() {
        state.images.remove(&previous.image_url).await;
    }
    Ok(Redirect::to("/admin/products").into_response())
}

pub async fn post_delete_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    form: FormBody,
) -> Result<Redirect> {
    let product = state
        .products
        .delete(&form.text("productId"), &user.id)
        .await?;
    state.images.remove(&product.image_url).await;
    Ok(Redirect::to("/admin/products"))
}

/// JSON variant used by the admin page script
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
) -> Response {
    match state.products.delete(&product_id, &user.id).await {
        Ok(product) => {
            state.images.remove(&product.image_url).await;
            Json(json!({ "message": "Success!" })).into_response()
        }
        Err(e) => {
            tracing::error!("Deleting product {} failed: {}", product_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Deleting product failed." })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(fields: &[(&str, &str)]) -> FormBody {
        FormBody(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_product_form_parsing() {
        let form = ProductForm::from_body(&body(&[
            ("title", "  Red Book "),
            ("price", "19.99"),
            ("description", "A red book."),
        ]));
        assert_eq!(form.title, "Red Book");
        assert_eq!(form.price, 19.99);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_product_form_rules() {
        let form = ProductForm::from_body(&body(&[
            ("title", "Red Book"),
            ("price", "free"),
            ("description", "A red book."),
        ]));
        let errors = form.validate().unwrap_err();
        assert_eq!(
            validation_message(&errors, &["title", "price", "description"]),
            "Price must be a positive number."
        );

        let form = ProductForm::from_body(&body(&[
            ("title", "Re"),
            ("price", "1"),
            ("description", "tiny"),
        ]));
        let errors = form.validate().unwrap_err();
        assert_eq!(
            validation_message(&errors, &["title", "price", "description"]),
            "Title must be at least 3 characters long."
        );
    }
}
