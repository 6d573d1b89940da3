//! Pipeline stages that sit between the session and the routes, plus the
//! terminal error stage.
//!
//! Stages run in the order they are listed in [`super::routes::with_pipeline`].

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

use super::body::FormBody;
use super::views;
use crate::auth::{check_request, CsrfGuard, Flash, Session, SessionFlag};
use crate::error::{AppError, ErrorReport, Result};
use crate::upload::UploadedFile;

/// Per-response values every page is rendered with
#[derive(Debug, Clone, Default)]
pub struct ViewLocals {
    pub is_authenticated: bool,
    pub csrf_token: String,
}

fn session_of(request: &Request) -> Result<Session> {
    request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Session("Session stage did not run".to_string()))
}

/// CSRF stage.
///
/// Reads the [`Session`] (creating its CSRF secret if missing) and, for
/// state-changing methods, the submitted token from [`FormBody`], the query
/// string or the token headers. Inserts a [`CsrfGuard`]. A missing or
/// invalid token is an error.
pub async fn csrf_protection(mut request: Request, next: Next) -> Result<Response> {
    let session = session_of(&request)?;
    let guard = CsrfGuard::for_session(&session);

    let empty = FormBody::default();
    let form = request.extensions().get::<FormBody>().unwrap_or(&empty);
    if let Err(e) = check_request(
        &guard,
        request.method(),
        &form.0,
        request.uri().query(),
        request.headers(),
    ) {
        tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        if let Some(file) = request.extensions().get::<UploadedFile>() {
            if let Err(err) = tokio::fs::remove_file(&file.path).await {
                tracing::warn!("Failed to remove {}: {}", file.path.display(), err);
            }
        }
        return Err(e);
    }

    request.extensions_mut().insert(guard);
    Ok(next.run(request).await)
}

/// Flash stage: inserts a [`Flash`] bound to the request's session
pub async fn flash_messages(mut request: Request, next: Next) -> Result<Response> {
    let session = session_of(&request)?;
    request.extensions_mut().insert(Flash::new(session));
    Ok(next.run(request).await)
}

/// Response locals stage.
///
/// Reads `session.isLoggedIn` and the [`CsrfGuard`]; inserts [`ViewLocals`]
/// with the login flag and a freshly issued token. Never short-circuits.
pub async fn response_locals(mut request: Request, next: Next) -> Response {
    let is_authenticated = request
        .extensions()
        .get::<Session>()
        .map(Session::is_logged_in)
        .unwrap_or(false);
    let csrf_token = request
        .extensions()
        .get::<CsrfGuard>()
        .map(CsrfGuard::token)
        .unwrap_or_default();

    request.extensions_mut().insert(ViewLocals {
        is_authenticated,
        csrf_token,
    });
    next.run(request).await
}

/// Unmatched method stage.
///
/// A path that only has routes for other methods is treated like any other
/// unmatched request and gets the 404 page instead of a bare 405.
pub async fn method_not_found(request: Request, next: Next) -> Response {
    let locals = request
        .extensions()
        .get::<ViewLocals>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(request).await;
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        return views::not_found(&locals);
    }
    response
}

/// Terminal error stage.
///
/// Any response carrying an [`ErrorReport`] is logged and replaced by the
/// fixed error page with status 500, whatever status the error intended.
/// Session cookies set on the failed response are kept.
pub async fn render_error_pages(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    tracing::error!(
        "{} {} failed: {} (would have been {})",
        method,
        path,
        report.message,
        report.intended_status
    );

    let is_authenticated = response
        .extensions()
        .get::<SessionFlag>()
        .map(|flag| flag.is_authenticated)
        .unwrap_or(false);

    let mut page = views::server_error(is_authenticated);
    for cookie in response.headers().get_all(header::SET_COOKIE) {
        page.headers_mut().append(header::SET_COOKIE, cookie.clone());
    }
    page
}

/// Turn a panic caught in the pipeline into an error response
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(format!("Handler panicked: {}", detail)).into_response()
}
