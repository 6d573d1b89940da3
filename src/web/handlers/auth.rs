use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use validator::Validate;

use super::validation_message;
use crate::auth::{normalize_email, Flash, Registration, Session};
use crate::error::Result;
use crate::state::AppState;
use crate::web::body::FormBody;
use crate::web::middleware::ViewLocals;
use crate::web::views::{self, AuthFormValues, Page};

#[derive(Debug, Validate)]
struct LoginForm {
    #[validate(email(message = "Please enter a valid email address."))]
    email: String,
    #[validate(length(min = 5, message = "Password has to be valid."))]
    password: String,
}

#[derive(Debug, Validate)]
struct SignupForm {
    #[validate(email(message = "Please enter a valid email."))]
    email: String,
    #[validate(length(
        min = 5,
        message = "Please enter a password with only numbers and text and at least 5 characters."
    ))]
    password: String,
    confirm_password: String,
}

impl SignupForm {
    /// Checks the derive cannot express
    fn extra_error(&self) -> Option<&'static str> {
        if !self.password.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Some(
                "Please enter a password with only numbers and text and at least 5 characters.",
            );
        }
        if self.password != self.confirm_password {
            return Some("Passwords have to match!");
        }
        None
    }
}

fn render_login(
    locals: &ViewLocals,
    status: StatusCode,
    message: Option<&str>,
    values: &AuthFormValues,
) -> Response {
    let page = Page::new("Login", "/login", locals);
    (status, Html(views::login(&page, message, values))).into_response()
}

fn render_signup(
    locals: &ViewLocals,
    status: StatusCode,
    message: Option<&str>,
    values: &AuthFormValues,
) -> Response {
    let page = Page::new("Signup", "/signup", locals);
    (status, Html(views::signup(&page, message, values))).into_response()
}

pub async fn get_login(locals: ViewLocals, flash: Flash) -> Response {
    let message = flash.take_one("error").or_else(|| flash.take_one("info"));
    render_login(
        &locals,
        StatusCode::OK,
        message.as_deref(),
        &AuthFormValues::default(),
    )
}

pub async fn post_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    locals: ViewLocals,
    form: FormBody,
) -> Result<Response> {
    let login = LoginForm {
        email: normalize_email(&form.text("email")),
        password: form.text("password"),
    };
    let values = AuthFormValues {
        email: login.email.clone(),
        password: login.password.clone(),
        ..Default::default()
    };

    if let Err(errors) = login.validate() {
        let message = validation_message(&errors, &["email", "password"]);
        return Ok(render_login(
            &locals,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(&message),
            &values,
        ));
    }

    let Some(user) = state.users.authenticate(&login.email, &login.password).await? else {
        tracing::info!("Failed login for {}", login.email);
        return Ok(render_login(
            &locals,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("Invalid email or password."),
            &values,
        ));
    };

    session.log_in(&user.id);
    tracing::info!("User {} logged in", user.email);
    Ok(Redirect::to("/").into_response())
}

pub async fn get_signup(locals: ViewLocals, flash: Flash) -> Response {
    let message = flash.take_one("error");
    render_signup(
        &locals,
        StatusCode::OK,
        message.as_deref(),
        &AuthFormValues::default(),
    )
}

pub async fn post_signup(
    State(state): State<Arc<AppState>>,
    flash: Flash,
    locals: ViewLocals,
    form: FormBody,
) -> Result<Response> {
    let signup = SignupForm {
        email: normalize_email(&form.text("email")),
        password: form.text("password"),
        confirm_password: form.text("confirmPassword"),
    };
    let values = AuthFormValues {
        email: signup.email.clone(),
        password: signup.password.clone(),
        confirm_password: signup.confirm_password.clone(),
    };

    let message = match signup.validate() {
        Err(errors) => Some(validation_message(&errors, &["email", "password"])),
        Ok(()) => signup.extra_error().map(str::to_string),
    };
    if let Some(message) = message {
        return Ok(render_signup(
            &locals,
            StatusCode::UNPROCESSABLE_ENTITY,
            Some(&message),
            &values,
        ));
    }

    let user = match state.users.register(&signup.email, &signup.password).await? {
        Registration::Created(user) => user,
        Registration::EmailTaken => {
            return Ok(render_signup(
                &locals,
                StatusCode::UNPROCESSABLE_ENTITY,
                Some("E-Mail exists already, please pick a different one."),
                &values,
            ));
        }
    };
    tracing::info!("User {} signed up", user.email);
    flash.push("info", "Account created, please log in.");
    Ok(Redirect::to("/login").into_response())
}

pub async fn post_logout(session: Session) -> Redirect {
    session.destroy();
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            email: "ada@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_signup_rules() {
        assert!(signup("abc12", "abc12").validate().is_ok());
        assert!(signup("abc12", "abc12").extra_error().is_none());

        assert!(signup("ab1", "ab1").validate().is_err());
        assert!(signup("abc 12", "abc 12").extra_error().is_some());
        assert_eq!(
            signup("abc12", "abc13").extra_error(),
            Some("Passwords have to match!")
        );
    }

    #[test]
    fn test_login_email_rule() {
        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: "hunter2".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            validation_message(&errors, &["email", "password"]),
            "Please enter a valid email address."
        );
    }
}
