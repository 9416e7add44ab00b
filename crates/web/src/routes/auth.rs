//! Authentication route handlers.
//!
//! Registration, sign-in and sign-out against the backend's identity
//! provider. Form errors re-render the form with the visitor's input.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use farmshare_core::AppRole;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, Page, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::routes::params::{SelectOption, fixed_options};
use crate::services::{AuthError, AuthService, RegisterInput, RegisterOutcome};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    pub password: String,
    /// Absent when no radio button was picked.
    pub role: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub error: Option<String>,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
    pub error: Option<String>,
    pub full_name: String,
    pub email: String,
    pub roles: Vec<SelectOption>,
}

/// Shown when the provider wants the email confirmed before sign-in.
#[derive(Template, WebTemplate)]
#[template(path = "auth/check_email.html")]
pub struct CheckEmailTemplate {
    pub page: Page,
    pub email: String,
}

fn role_options(selected: &str) -> Vec<SelectOption> {
    let choices: Vec<(&str, &str)> = AppRole::SELF_SERVICE
        .iter()
        .map(|role| (role.as_str(), role.label()))
        .collect();
    fixed_options(&choices, selected)
}

/// Store the user and head to their dashboard.
async fn sign_in_session(session: &Session, user: &CurrentUser, greeting: Flash) -> Result<Response> {
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    greeting.store(session).await;
    Ok(Redirect::to(user.role.dashboard_path()).into_response())
}

fn log_auth_failure(err: &AuthError, action: &str) {
    if err.is_server_error() {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, action, "Authentication failed");
    } else {
        tracing::info!(error = %err, action, "Authentication rejected");
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in visitors go to their dashboard.
pub async fn login_page(page: Page) -> Response {
    if let Some(user) = &page.user {
        return Redirect::to(user.role.dashboard_path()).into_response();
    }
    LoginTemplate {
        page,
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.backend())
        .sign_in(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let greeting = Flash::success("Welcome back", format!("Signed in as {}", user.full_name));
            sign_in_session(&session, &user, greeting).await
        }
        Err(e) => {
            log_auth_failure(&e, "login");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    page,
                    error: Some(e.user_message()),
                    email: form.email,
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: Page) -> Response {
    if let Some(user) = &page.user {
        return Redirect::to(user.role.dashboard_path()).into_response();
    }
    RegisterTemplate {
        page,
        error: None,
        full_name: String::new(),
        email: String::new(),
        roles: role_options(""),
    }
    .into_response()
}

/// Handle registration form submission.
///
/// A role is required. When the provider signs the user in straight away
/// they land on their role's dashboard; otherwise they are asked to
/// confirm their email.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    page: Page,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let input = RegisterInput {
        full_name: &form.full_name,
        email: &form.email,
        password: &form.password,
        role: form.role.as_deref(),
    };

    match AuthService::new(state.backend()).register(input).await {
        Ok(RegisterOutcome::SignedIn(user)) => {
            let greeting = Flash::success(
                "Welcome to FarmShare",
                format!("Your {} account is ready", user.role.label().to_lowercase()),
            );
            sign_in_session(&session, &user, greeting).await
        }
        Ok(RegisterOutcome::ConfirmationRequired(email)) => Ok(CheckEmailTemplate {
            page,
            email: email.to_string(),
        }
        .into_response()),
        Err(e) => {
            log_auth_failure(&e, "register");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                RegisterTemplate {
                    page,
                    error: Some(e.user_message()),
                    roles: role_options(form.role.as_deref().unwrap_or_default()),
                    full_name: form.full_name,
                    email: form.email,
                },
            )
                .into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out. The provider token is revoked best-effort; the cart stays.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Result<Redirect> {
    if let Some(user) = &user {
        AuthService::new(state.backend()).sign_out(user).await;
    }
    clear_current_user(&session).await?;
    clear_sentry_user();
    Flash::success("Signed out", "See you soon").store(&session).await;
    Ok(Redirect::to("/"))
}
