//! Extractors for values the pipeline stages leave in request extensions.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use super::body::FormBody;
use super::middleware::ViewLocals;
use crate::auth::{CurrentUser, Flash, Session};
use crate::error::AppError;

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for FormBody {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<FormBody>().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ViewLocals {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ViewLocals>()
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Session("No session on request".to_string()))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Flash>()
            .cloned()
            .ok_or_else(|| AppError::Session("No flash store on request".to_string()))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
