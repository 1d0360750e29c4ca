use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use super::{sign_in_redirect, Html};
use crate::auth::handlers::{authenticate, clear_session_cookie, register, session_cookie};
use crate::auth::session::{self, ClientInfo};
use crate::blog::users;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{session_token, CurrentUser, MaybeUser};
use crate::state::AppState;
use crate::validation::{UserForm, ValidationErrors};

#[derive(Template)]
#[template(path = "pages/sign_in.html")]
struct SignInTemplate {
    user: Option<CurrentUser>,
    email: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "pages/sign_up.html")]
struct SignUpTemplate {
    user: Option<CurrentUser>,
    name: String,
    email: String,
    age: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
struct ProfileTemplate {
    user: Option<CurrentUser>,
    profile: User,
    member_since: String,
    name: String,
    age: String,
    saved: bool,
    errors: Vec<String>,
}

#[derive(Deserialize)]
pub struct SignInFields {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpFields {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub age: String,
}

#[derive(Deserialize)]
pub struct ProfileFields {
    pub name: String,
    #[serde(default)]
    pub age: String,
}

/// Parses an optional age field. Blank means "not given".
fn parse_age(raw: &str) -> Result<Option<i64>, ValidationErrors> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ValidationErrors::single("age", "Age must be a whole number"))
}

fn signed_in(config: &crate::config::Config, token: &str) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(config, token))],
        Redirect::to("/"),
    )
        .into_response()
}

/// GET /sign-in
async fn sign_in_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(SignInTemplate {
        user: None,
        email: String::new(),
        errors: Vec::new(),
    })
    .into_response()
}

/// POST /sign-in
async fn sign_in(
    State(state): State<AppState>,
    client: ClientInfo,
    Form(fields): Form<SignInFields>,
) -> AppResult<Response> {
    let form = UserForm::SignIn {
        email: fields.email.clone(),
        password: fields.password,
    };
    let conn = state.db.get()?;
    let (status, errors) = match authenticate(&conn, &state.config, &form, &client) {
        Ok((_, token)) => return Ok(signed_in(&state.config, &token)),
        Err(AppError::Unauthorized) => (
            StatusCode::UNAUTHORIZED,
            vec!["Invalid email or password".to_string()],
        ),
        Err(AppError::Validation(errors)) => (StatusCode::UNPROCESSABLE_ENTITY, errors.messages()),
        Err(e) => return Err(e),
    };

    Ok((
        status,
        Html(SignInTemplate {
            user: None,
            email: fields.email,
            errors,
        }),
    )
        .into_response())
}

/// GET /sign-up
async fn sign_up_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(SignUpTemplate {
        user: None,
        name: String::new(),
        email: String::new(),
        age: String::new(),
        errors: Vec::new(),
    })
    .into_response()
}

/// POST /sign-up
async fn sign_up(
    State(state): State<AppState>,
    client: ClientInfo,
    Form(fields): Form<SignUpFields>,
) -> AppResult<Response> {
    let result = parse_age(&fields.age)
        .map_err(AppError::from)
        .and_then(|age| {
            let form = UserForm::SignUp {
                email: fields.email.clone(),
                name: fields.name.clone(),
                password: fields.password.clone(),
                age,
            };
            let conn = state.db.get()?;
            register(&conn, &state.config, &form, &client)
        });

    let (status, errors) = match result {
        Ok((_, token)) => return Ok(signed_in(&state.config, &token)),
        Err(AppError::Validation(errors)) => (StatusCode::UNPROCESSABLE_ENTITY, errors.messages()),
        Err(AppError::Conflict(message)) => (StatusCode::CONFLICT, vec![message]),
        Err(e) => return Err(e),
    };

    Ok((
        status,
        Html(SignUpTemplate {
            user: None,
            name: fields.name,
            email: fields.email,
            age: fields.age,
            errors,
        }),
    )
        .into_response())
}

/// POST /sign-out
async fn sign_out(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();

    if let Some(token) = session_token(&parts, &state.config.auth.cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&state.config))],
        Redirect::to("/"),
    )
        .into_response())
}

fn profile_page(
    user: CurrentUser,
    profile: User,
    name: String,
    age: String,
    saved: bool,
    errors: Vec<String>,
) -> ProfileTemplate {
    ProfileTemplate {
        user: Some(user),
        member_since: profile.created_at.format("%b %-d, %Y").to_string(),
        profile,
        name,
        age,
        saved,
        errors,
    }
}

/// GET /profile
async fn show_profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let conn = state.db.get()?;
    let profile = users::get(&conn, &user.id)?.ok_or(AppError::Unauthorized)?;
    let name = profile.name.clone();
    let age = profile.age.map(|a| a.to_string()).unwrap_or_default();
    Ok(Html(profile_page(user, profile, name, age, false, Vec::new())).into_response())
}

/// POST /profile
async fn update_profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(fields): Form<ProfileFields>,
) -> AppResult<Response> {
    let Some(mut user) = user else {
        return Ok(sign_in_redirect());
    };
    let conn = state.db.get()?;

    let result = parse_age(&fields.age).map_err(AppError::from).and_then(|age| {
        let form = UserForm::Update {
            id: user.id.clone(),
            name: fields.name.clone(),
            age,
        };
        users::update_profile(&conn, &user.id, &form)
    });

    match result {
        Ok(profile) => {
            user.name = profile.name.clone();
            let name = profile.name.clone();
            let age = profile.age.map(|a| a.to_string()).unwrap_or_default();
            Ok(Html(profile_page(user, profile, name, age, true, Vec::new())).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let profile = users::get(&conn, &user.id)?.ok_or(AppError::Unauthorized)?;
            let page = profile_page(user, profile, fields.name, fields.age, false, errors.messages());
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(sign_in_page).post(sign_in))
        .route("/sign-up", get(sign_up_page).post(sign_up))
        .route("/sign-out", post(sign_out))
        .route("/profile", get(show_profile).post(update_profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_age_is_none() {
        assert_eq!(parse_age("  ").unwrap(), None);
        assert_eq!(parse_age("42").unwrap(), Some(42));
    }

    #[test]
    fn non_numeric_age_is_a_field_error() {
        let errors = parse_age("forty").unwrap_err();
        assert!(errors.field("age").is_some());
    }
}
