//! Body parsing stage.

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{ImageStore, UploadedFile, IMAGE_FIELD};

/// Decoded text fields of a form submission, in submission order
#[derive(Debug, Clone, Default)]
pub struct FormBody(pub Vec<(String, String)>);

impl FormBody {
    /// First value submitted for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `name`, or an empty string
    pub fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }
}

enum BodyKind {
    UrlEncoded,
    Multipart,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::UrlEncoded
    } else if content_type.starts_with("multipart/form-data") {
        BodyKind::Multipart
    } else {
        BodyKind::Other
    }
}

/// Body parsing stage.
///
/// Url-encoded bodies become a [`FormBody`]. Multipart bodies contribute
/// their text fields to [`FormBody`] and at most one file from the `image`
/// field, which goes through the upload filter and is attached as
/// [`UploadedFile`] when accepted. A file in any other field, or a second
/// image, is an error. Other bodies are left untouched.
pub async fn parse_body(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let request = match body_kind(request.headers()) {
        BodyKind::UrlEncoded => parse_urlencoded(request, state.config.web.body_limit).await,
        BodyKind::Multipart => parse_multipart(request, &state.images).await,
        BodyKind::Other => Ok(request),
    };

    match request {
        Ok(request) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

async fn parse_urlencoded(request: Request, limit: usize) -> Result<Request> {
    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form body: {}", e)))?;

    let fields = url::form_urlencoded::parse(&bytes)
        .into_owned()
        .collect::<Vec<_>>();
    parts.extensions.insert(FormBody(fields));

    Ok(Request::from_parts(parts, Body::empty()))
}

async fn parse_multipart(request: Request, images: &ImageStore) -> Result<Request> {
    let (mut parts, body) = request.into_parts();

    // Multipart extraction needs the headers and the body limit extension
    let mut multipart_request = Request::new(body);
    *multipart_request.headers_mut() = parts.headers.clone();
    *multipart_request.extensions_mut() = parts.extensions.clone();

    let mut multipart = Multipart::from_request(multipart_request, &())
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?;

    let mut fields = Vec::new();
    let mut upload: Option<UploadedFile> = None;
    let mut image_seen = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
            fields.push((name, value));
            continue;
        }

        if name != IMAGE_FIELD || image_seen {
            if let Some(file) = upload.take() {
                images.remove(&file.url()).await;
            }
            return Err(AppError::UnexpectedField(name));
        }
        image_seen = true;
        upload = images.store_field(field).await?;
    }

    parts.extensions.insert(FormBody(fields));
    if let Some(file) = upload {
        parts.extensions.insert(file);
    }

    Ok(Request::from_parts(parts, Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_form_body_lookup() {
        let form = FormBody(vec![
            ("title".to_string(), "Book".to_string()),
            ("title".to_string(), "Second".to_string()),
        ]);
        assert_eq!(form.get("title"), Some("Book"));
        assert_eq!(form.text("price"), "");
    }

    #[test]
    fn test_body_kind() {
        let mut headers = HeaderMap::new();
        assert!(matches!(body_kind(&headers), BodyKind::Other));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        assert!(matches!(body_kind(&headers), BodyKind::UrlEncoded));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=X"),
        );
        assert!(matches!(body_kind(&headers), BodyKind::Multipart));
    }
}
