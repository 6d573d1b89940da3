mod cookie;
mod csrf;
mod flash;
mod password;
mod session;
mod user;
pub mod middleware;

pub use cookie::CookieSigner;
pub use csrf::{check_request, CsrfGuard, CSRF_FIELD};
pub use flash::Flash;
pub use middleware::{attach_user, require_login, session_middleware, CurrentUser, SessionFlag};
pub use password::{hash_password, verify_password};
pub use session::{
    generate_session_id, Session, SessionData, SessionStore, SessionUser, SESSION_COOKIE,
};
pub use user::{normalize_email, Registration, User, UserStore};

#[cfg(test)]
pub(crate) use user::registered;
