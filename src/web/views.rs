//! Server-rendered pages.
//!
//! Every page goes through [`layout`], which renders the navigation from the
//! response locals (login state and the CSRF token for the logout form).

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::fmt::Write as _;

use super::middleware::ViewLocals;
use crate::auth::CSRF_FIELD;
use crate::shop::{CartLine, Order, Product, ProductPage};

/// Escape text for HTML bodies and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Values every page needs besides its body
pub struct Page<'a> {
    pub title: &'a str,
    pub path: &'a str,
    pub is_authenticated: bool,
    pub csrf_token: &'a str,
}

impl<'a> Page<'a> {
    pub fn new(title: &'a str, path: &'a str, locals: &'a ViewLocals) -> Self {
        Self {
            title,
            path,
            is_authenticated: locals.is_authenticated,
            csrf_token: &locals.csrf_token,
        }
    }
}

fn csrf_input(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        CSRF_FIELD,
        escape_html(token)
    )
}

fn nav_link(page: &Page<'_>, href: &str, label: &str) -> String {
    let class = if page.path == href { " class=\"active\"" } else { "" };
    format!(r#"<li><a href="{}"{}>{}</a></li>"#, href, class, label)
}

/// Wrap `body` in the shared document shell
pub fn layout(page: &Page<'_>, body: &str) -> String {
    let mut nav = String::new();
    nav.push_str(&nav_link(page, "/", "Shop"));
    nav.push_str(&nav_link(page, "/products", "Products"));
    if page.is_authenticated {
        nav.push_str(&nav_link(page, "/cart", "Cart"));
        nav.push_str(&nav_link(page, "/orders", "Orders"));
        nav.push_str(&nav_link(page, "/admin/add-product", "Add Product"));
        nav.push_str(&nav_link(page, "/admin/products", "Admin Products"));
    }

    let account = if page.is_authenticated {
        format!(
            r#"<li><form action="/logout" method="POST">{}<button type="submit">Logout</button></form></li>"#,
            csrf_input(page.csrf_token)
        )
    } else {
        format!(
            "{}{}",
            nav_link(page, "/login", "Login"),
            nav_link(page, "/signup", "Signup")
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/css/main.css">
</head>
<body>
    <header class="main-header">
        <nav><ul class="main-header__item-list">{nav}</ul></nav>
        <nav><ul class="main-header__item-list">{account}</ul></nav>
    </header>
    <main>
{body}
    </main>
</body>
</html>"#,
        title = escape_html(page.title),
        nav = nav,
        account = account,
        body = body
    )
}

fn error_box(message: Option<&str>) -> String {
    match message {
        Some(message) => format!(
            r#"<div class="user-message user-message--error">{}</div>"#,
            escape_html(message)
        ),
        None => String::new(),
    }
}

/// The fixed error page, always answered with 500
pub fn server_error(is_authenticated: bool) -> Response {
    let page = Page {
        title: "Error!",
        path: "/500",
        is_authenticated,
        csrf_token: "",
    };
    let body = r#"<h1>Some error occurred!</h1>
<p>We're working on fixing this, sorry for the inconvenience!</p>"#;
    (StatusCode::INTERNAL_SERVER_ERROR, Html(layout(&page, body))).into_response()
}

pub fn not_found(locals: &ViewLocals) -> Response {
    let page = Page::new("Page Not Found", "/404", locals);
    (
        StatusCode::NOT_FOUND,
        Html(layout(&page, "<h1>Page Not Found!</h1>")),
    )
        .into_response()
}

fn product_card(product: &Product, actions: &str) -> String {
    format!(
        r#"<article class="card product-item">
    <header class="card__header"><h1 class="product__title">{title}</h1></header>
    <div class="card__image"><img src="{image}" alt="{title}"></div>
    <div class="card__content">
        <h2 class="product__price">${price:.2}</h2>
        <p class="product__description">{description}</p>
    </div>
    <div class="card__actions">{actions}</div>
</article>"#,
        title = escape_html(&product.title),
        image = escape_html(&product.image_url),
        price = product.price,
        description = escape_html(&product.description),
        actions = actions
    )
}

fn add_to_cart_form(page: &Page<'_>, product: &Product) -> String {
    if !page.is_authenticated {
        return String::new();
    }
    format!(
        r#"<form action="/cart" method="post">{}<input type="hidden" name="productId" value="{}"><button class="btn" type="submit">Add to Cart</button></form>"#,
        csrf_input(page.csrf_token),
        escape_html(&product.id)
    )
}

fn product_grid(page: &Page<'_>, products: &[Product], admin: bool) -> String {
    if products.is_empty() {
        return "<h1>No Products Found!</h1>".to_string();
    }

    let mut grid = String::from(r#"<div class="grid">"#);
    for product in products {
        let actions = if admin {
            format!(
                r#"<a href="/admin/edit-product/{id}?edit=true" class="btn">Edit</a>
<form action="/admin/delete-product" method="post">{csrf}<input type="hidden" name="productId" value="{id}"><button class="btn" type="submit">Delete</button></form>"#,
                id = escape_html(&product.id),
                csrf = csrf_input(page.csrf_token)
            )
        } else {
            format!(
                r#"<a href="/products/{}" class="btn">Details</a>{}"#,
                escape_html(&product.id),
                add_to_cart_form(page, product)
            )
        };
        grid.push_str(&product_card(product, &actions));
    }
    grid.push_str("</div>");
    grid
}

pub fn shop_index(page: &Page<'_>, listing: &ProductPage) -> String {
    let mut body = product_grid(page, &listing.products, false);

    body.push_str(r#"<section class="pagination">"#);
    if listing.has_previous() {
        let _ = write!(
            body,
            r#"<a href="/?page={}">{}</a>"#,
            listing.current_page - 1,
            listing.current_page - 1
        );
    }
    let _ = write!(
        body,
        r#"<a href="/?page={}" class="active">{}</a>"#,
        listing.current_page, listing.current_page
    );
    if listing.has_next() {
        let _ = write!(
            body,
            r#"<a href="/?page={}">{}</a>"#,
            listing.current_page + 1,
            listing.current_page + 1
        );
    }
    body.push_str("</section>");

    layout(page, &body)
}

pub fn product_list(page: &Page<'_>, products: &[Product]) -> String {
    layout(page, &product_grid(page, products, false))
}

pub fn admin_products(page: &Page<'_>, products: &[Product]) -> String {
    let mut body = product_grid(page, products, true);
    body.push_str(r#"<script src="/js/admin.js"></script>"#);
    layout(page, &body)
}

pub fn product_detail(page: &Page<'_>, product: &Product) -> String {
    let body = format!(
        r#"<div class="centered">
    <h1>{title}</h1>
    <hr>
    <div class="image"><img src="{image}" alt="{title}"></div>
    <h2>${price:.2}</h2>
    <p>{description}</p>
    {cart}
</div>"#,
        title = escape_html(&product.title),
        image = escape_html(&product.image_url),
        price = product.price,
        description = escape_html(&product.description),
        cart = add_to_cart_form(page, product)
    );
    layout(page, &body)
}

pub fn cart(page: &Page<'_>, message: Option<&str>, lines: &[CartLine]) -> String {
    let mut body = error_box(message);
    if lines.is_empty() {
        body.push_str("<h1>No Products in Cart!</h1>");
        return layout(page, &body);
    }

    body.push_str(r#"<ul class="cart__item-list">"#);
    let mut total = 0.0;
    for line in lines {
        total += line.subtotal();
        let _ = write!(
            body,
            r#"<li class="cart__item"><h1>{title}</h1><h2>Quantity: {qty}</h2>
<form action="/cart-delete-item" method="POST">{csrf}<input type="hidden" name="productId" value="{id}"><button class="btn danger" type="submit">Delete</button></form></li>"#,
            title = escape_html(&line.product.title),
            qty = line.quantity,
            csrf = csrf_input(page.csrf_token),
            id = escape_html(&line.product.id)
        );
    }
    let _ = write!(
        body,
        r#"</ul><hr><div class="centered"><h2>Total: ${:.2}</h2>
<form action="/create-order" method="POST">{}<button type="submit" class="btn">Order Now!</button></form></div>"#,
        total,
        csrf_input(page.csrf_token)
    );

    layout(page, &body)
}

pub fn orders(page: &Page<'_>, orders: &[Order]) -> String {
    if orders.is_empty() {
        return layout(page, "<h1>Nothing there!</h1>");
    }

    let mut body = String::from(r#"<ul class="orders">"#);
    for order in orders {
        let _ = write!(
            body,
            r#"<li class="orders__item"><h1>Order - # {}</h1><ul class="orders__products">"#,
            escape_html(&order.id)
        );
        for item in &order.items {
            let _ = write!(
                body,
                r#"<li class="orders__products-item">{} ({})</li>"#,
                escape_html(&item.title),
                item.quantity
            );
        }
        let _ = write!(body, "</ul><p>Total: ${:.2}</p></li>", order.total());
    }
    body.push_str("</ul>");

    layout(page, &body)
}

/// Values to refill the login and signup forms with
#[derive(Debug, Default)]
pub struct AuthFormValues {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub fn login(page: &Page<'_>, error: Option<&str>, values: &AuthFormValues) -> String {
    let body = format!(
        r#"{error}
<form class="login-form" action="/login" method="POST" novalidate>
    <div class="form-control">
        <label for="email">E-Mail</label>
        <input type="email" name="email" id="email" value="{email}">
    </div>
    <div class="form-control">
        <label for="password">Password</label>
        <input type="password" name="password" id="password" value="{password}">
    </div>
    {csrf}
    <button class="btn" type="submit">Login</button>
</form>"#,
        error = error_box(error),
        email = escape_html(&values.email),
        password = escape_html(&values.password),
        csrf = csrf_input(page.csrf_token)
    );
    layout(page, &body)
}

pub fn signup(page: &Page<'_>, error: Option<&str>, values: &AuthFormValues) -> String {
    let body = format!(
        r#"{error}
<form class="login-form" action="/signup" method="POST" novalidate>
    <div class="form-control">
        <label for="email">E-Mail</label>
        <input type="email" name="email" id="email" value="{email}">
    </div>
    <div class="form-control">
        <label for="password">Password</label>
        <input type="password" name="password" id="password" value="{password}">
    </div>
    <div class="form-control">
        <label for="confirmPassword">Confirm Password</label>
        <input type="password" name="confirmPassword" id="confirmPassword" value="{confirm}">
    </div>
    {csrf}
    <button class="btn" type="submit">Signup</button>
</form>"#,
        error = error_box(error),
        email = escape_html(&values.email),
        password = escape_html(&values.password),
        confirm = escape_html(&values.confirm_password),
        csrf = csrf_input(page.csrf_token)
    );
    layout(page, &body)
}

/// Values to refill the product form with
#[derive(Debug, Default)]
pub struct ProductFormValues {
    pub id: Option<String>,
    pub title: String,
    pub price: String,
    pub description: String,
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id.clone()),
            title: product.title.clone(),
            price: format!("{:.2}", product.price),
            description: product.description.clone(),
        }
    }
}

/// Add or edit form; editing when `values.id` is set
pub fn product_form(page: &Page<'_>, error: Option<&str>, values: &ProductFormValues) -> String {
    let (action, button, hidden_id) = match &values.id {
        Some(id) => (
            "/admin/edit-product",
            "Update Product",
            format!(
                r#"<input type="hidden" name="productId" value="{}">"#,
                escape_html(id)
            ),
        ),
        None => ("/admin/add-product", "Add Product", String::new()),
    };

    let body = format!(
        r#"{error}
<form class="product-form" action="{action}" method="POST" enctype="multipart/form-data">
    <div class="form-control">
        <label for="title">Title</label>
        <input type="text" name="title" id="title" value="{title}">
    </div>
    <div class="form-control">
        <label for="image">Image</label>
        <input type="file" name="image" id="image">
    </div>
    <div class="form-control">
        <label for="price">Price</label>
        <input type="number" name="price" id="price" step="0.01" value="{price}">
    </div>
    <div class="form-control">
        <label for="description">Description</label>
        <textarea name="description" id="description" rows="5">{description}</textarea>
    </div>
    {hidden_id}
    {csrf}
    <button class="btn" type="submit">{button}</button>
</form>"#,
        error = error_box(error),
        action = action,
        title = escape_html(&values.title),
        price = escape_html(&values.price),
        description = escape_html(&values.description),
        hidden_id = hidden_id,
        csrf = csrf_input(page.csrf_token),
        button = button
    );
    layout(page, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locals(is_authenticated: bool) -> ViewLocals {
        ViewLocals {
            is_authenticated,
            csrf_token: "tok<en>".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_layout_navigation_follows_login_state() {
        let guest = locals(false);
        let html = layout(&Page::new("Shop", "/", &guest), "");
        assert!(html.contains(r#"href="/login""#));
        assert!(!html.contains(r#"action="/logout""#));

        let member = locals(true);
        let html = layout(&Page::new("Shop", "/", &member), "");
        assert!(html.contains(r#"action="/logout""#));
        assert!(html.contains(r#"value="tok&lt;en&gt;""#));
    }

    #[test]
    fn test_server_error_page() {
        let response = server_error(true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_product_form_modes() {
        let page_locals = locals(true);
        let page = Page::new("Add Product", "/admin/add-product", &page_locals);

        let html = product_form(&page, None, &ProductFormValues::default());
        assert!(html.contains(r#"action="/admin/add-product""#));

        let values = ProductFormValues {
            id: Some("p1".to_string()),
            ..Default::default()
        };
        let html = product_form(&page, Some("Bad title"), &values);
        assert!(html.contains(r#"action="/admin/edit-product""#));
        assert!(html.contains("Bad title"));
    }
}
