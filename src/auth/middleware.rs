use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use super::session::{generate_session_id, Session, SESSION_COOKIE};
use super::user::User;
use crate::error::Result;
use crate::state::AppState;

/// The user the current request's session belongs to
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Login flag of the session as it stood after the request was handled.
///
/// Stamped on the response so the error page stage can render with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFlag {
    pub is_authenticated: bool,
}

/// Extract the session ID from a signed cookie
pub fn extract_session_id(state: &AppState, cookies: &CookieJar) -> Option<String> {
    let cookie = cookies.get(SESSION_COOKIE)?;
    let id = state.signer.unsign(cookie.value());
    if id.is_none() {
        tracing::debug!("Ignoring session cookie with a bad signature");
    }
    id
}

/// Session stage.
///
/// Reads the signed session cookie and loads the stored session, or starts an
/// empty one. Inserts a [`Session`] handle for later stages. After the inner
/// stages respond it persists the session:
/// - destroyed: the record is deleted and the cookie cleared
/// - modified: the record is saved; a fresh id gets a new cookie
/// - untouched but stored: the expiry is extended
///
/// Nothing is written for a new session that was never modified. Store
/// failures short-circuit with an error response.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    cookies: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match load_session(&state, &cookies).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let snapshot = session.snapshot();
    response.extensions_mut().insert(SessionFlag {
        is_authenticated: snapshot.data.is_logged_in,
    });

    match persist_session(&state, cookies, &session).await {
        Ok(Some(jar)) => (jar, response).into_response(),
        Ok(None) => response,
        Err(e) => e.into_response(),
    }
}

async fn load_session(state: &AppState, cookies: &CookieJar) -> Result<Session> {
    let Some(id) = extract_session_id(state, cookies) else {
        return Ok(Session::new());
    };

    match state.sessions.load(&id).await? {
        Some(data) => Ok(Session::existing(id, data)),
        None => Ok(Session::new()),
    }
}

/// Write back session changes, returning the cookie jar to send if it changed
async fn persist_session(
    state: &AppState,
    cookies: CookieJar,
    session: &Session,
) -> Result<Option<CookieJar>> {
    let snapshot = session.snapshot();

    if snapshot.destroyed {
        if let Some(id) = &snapshot.id {
            state.sessions.destroy(id).await?;
        }
        let removal = Cookie::build(SESSION_COOKIE).path("/");
        return Ok(Some(cookies.remove(removal)));
    }

    match (snapshot.id, snapshot.modified) {
        (Some(id), true) => {
            state.sessions.save(&id, &snapshot.data).await?;
            Ok(None)
        }
        (None, true) => {
            let id = generate_session_id();
            state.sessions.save(&id, &snapshot.data).await?;
            tracing::debug!("Created session {}...", &id[..8]);

            let cookie = Cookie::build((SESSION_COOKIE, state.signer.sign(&id)))
                .http_only(true)
                .same_site(SameSite::Lax)
                .path("/")
                .max_age(time::Duration::seconds(state.config.session.ttl_secs));
            Ok(Some(cookies.add(cookie)))
        }
        (Some(id), false) => {
            state.sessions.touch(&id).await?;
            Ok(None)
        }
        (None, false) => Ok(None),
    }
}

/// User attachment stage.
///
/// Reads `session.user`. With no user reference the request passes through
/// untouched. Otherwise the user is fetched: a missing record passes through
/// without a user, a found record is inserted as [`CurrentUser`], and a
/// lookup failure is returned as the error.
pub async fn attach_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user_id = request
        .extensions()
        .get::<Session>()
        .and_then(Session::user_id);

    if let Some(user_id) = user_id {
        match state.users.get(&user_id).await? {
            Some(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            None => {
                tracing::debug!("Session references missing user {}", user_id);
            }
        }
    }

    Ok(next.run(request).await)
}

/// Gate for routes that need a logged-in session; others go to `/login`
pub async fn require_login(request: Request, next: Next) -> Response {
    let logged_in = request
        .extensions()
        .get::<Session>()
        .map(Session::is_logged_in)
        .unwrap_or(false);

    if !logged_in {
        return Redirect::to("/login").into_response();
    }

    next.run(request).await
}

