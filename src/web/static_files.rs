use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::state::AppState;
use crate::upload::IMAGES_URL_PREFIX;

/// Static file stage.
///
/// For GET and HEAD, serves a matching file from the public directory at the
/// site root, or from the images directory under `/images`. Anything else,
/// including a miss, passes through to the next stage.
pub async fn serve_static(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let assets = &state.config.assets;

    if let Some(response) = try_serve_file(&assets.public_dir_path(), &path).await {
        return response;
    }

    if let Some(rest) = path.strip_prefix(IMAGES_URL_PREFIX) {
        if let Some(response) = try_serve_file(&assets.images_dir_path(), rest).await {
            return response;
        }
    }

    next.run(request).await
}

/// Map a URL path onto `base_dir`, refusing anything that leaves it
fn resolve(base_dir: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let mut file_path = base_dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => file_path.push(part),
            _ => {
                tracing::warn!("Path traversal attempt blocked: {}", url_path);
                return None;
            }
        }
    }
    Some(file_path)
}

async fn try_serve_file(base_dir: &Path, url_path: &str) -> Option<Response> {
    let file_path = resolve(base_dir, url_path)?;

    // Symlinks must not lead outside the base directory either
    if let (Ok(normalized_path), Ok(normalized_base)) = (
        tokio::fs::canonicalize(&file_path).await,
        tokio::fs::canonicalize(base_dir).await,
    ) {
        if !normalized_path.starts_with(&normalized_base) {
            tracing::warn!("Path traversal attempt blocked (canonicalized): {}", url_path);
            return None;
        }
    }

    let metadata = tokio::fs::metadata(&file_path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    match tokio::fs::read(&file_path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&file_path)
                .first_or_octet_stream()
                .to_string();

            Some(
                (
                    [
                        (header::CONTENT_TYPE, mime),
                        (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                    ],
                    data,
                )
                    .into_response(),
            )
        }
        Err(e) => {
            tracing::debug!(
                "Failed to read static file '{}' from '{}': {}",
                url_path,
                file_path.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let base = Path::new("public");
        assert_eq!(
            resolve(base, "/css/main.css"),
            Some(PathBuf::from("public/css/main.css"))
        );
        assert_eq!(
            resolve(base, "/a%20b.png"),
            Some(PathBuf::from("public/a b.png"))
        );
        assert!(resolve(base, "/").is_none());
        assert!(resolve(base, "/../Cargo.toml").is_none());
        assert!(resolve(base, "/css/%2E%2E/%2E%2E/secret").is_none());
    }
}
