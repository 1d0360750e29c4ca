use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::password;
use crate::auth::session::{self, ClientInfo};
use crate::blog::users;
use crate::config::Config;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{session_token, MaybeUser};
use crate::state::AppState;
use crate::validation::{UserForm, Validate};

// -- Request types --

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: Option<i64>,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub redirect: &'static str,
}

// -- Cookie helpers --

pub fn session_cookie(config: &Config, token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        config.auth.cookie_name,
        token,
        config.session_max_age_secs()
    )
}

pub fn clear_session_cookie(config: &Config) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        config.auth.cookie_name
    )
}

// -- Shared flows, used by both the JSON API and the HTML forms --

/// Registers a user from a `signUp` form and opens a session. Returns the user and session token.
pub fn register(
    conn: &Connection,
    config: &Config,
    form: &UserForm,
    client: &ClientInfo,
) -> AppResult<(User, String)> {
    let UserForm::SignUp {
        email,
        name,
        password,
        age,
    } = form
    else {
        return Err(AppError::BadRequest("Mode must be 'signUp'".into()));
    };
    form.validate()?;

    let hash = password::hash_password(password, config.auth.bcrypt_cost)?;
    let user = users::create_with_password(conn, name, email, *age, &hash)?;
    let token = session::create_session(conn, &user.id, config.auth.session_hours, client)?;
    Ok((user, token))
}

/// Verifies a `signIn` form and opens a session.
pub fn authenticate(
    conn: &Connection,
    config: &Config,
    form: &UserForm,
    client: &ClientInfo,
) -> AppResult<(User, String)> {
    let UserForm::SignIn { email, password } = form else {
        return Err(AppError::BadRequest("Mode must be 'signIn'".into()));
    };
    form.validate()?;

    let Some((user, hash)) = users::find_credentials(conn, email)? else {
        tracing::info!("Sign-in failed: unknown email");
        return Err(AppError::Unauthorized);
    };
    if !password::verify_password(password, &hash) {
        tracing::info!(user_id = %user.id, "Sign-in failed: wrong password");
        return Err(AppError::Unauthorized);
    }

    let token = session::create_session(conn, &user.id, config.auth.session_hours, client)?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok((user, token))
}

fn invalid_credentials() -> Response {
    (StatusCode::UNAUTHORIZED, "Invalid email or password").into_response()
}

// -- JSON handlers --

/// POST /api/auth/sign-up/email
pub async fn sign_up_email(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(req): Json<SignUpRequest>,
) -> AppResult<Response> {
    let form = UserForm::SignUp {
        email: req.email,
        name: req.name,
        password: req.password,
        age: req.age,
    };
    let conn = state.db.get()?;
    let (user, token) = register(&conn, &state.config, &form, &client)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state.config, &token))],
        Json(AuthResponse {
            user,
            redirect: "/",
        }),
    )
        .into_response())
}

/// POST /api/auth/sign-in/email
pub async fn sign_in_email(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(req): Json<SignInRequest>,
) -> AppResult<Response> {
    let form = UserForm::SignIn {
        email: req.email,
        password: req.password,
    };
    let conn = state.db.get()?;
    let (user, token) = match authenticate(&conn, &state.config, &form, &client) {
        Ok(ok) => ok,
        Err(AppError::Unauthorized) => return Ok(invalid_credentials()),
        Err(e) => return Err(e),
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state.config, &token))],
        Json(AuthResponse {
            user,
            redirect: "/",
        }),
    )
        .into_response())
}

/// POST /api/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();

    if let Some(token) = session_token(&parts, &state.config.auth.cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(&state.config))],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// GET /api/auth/get-session, returns `{session, user}` or `null`
pub async fn get_session(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<serde_json::Value>> {
    let Some(current) = user else {
        return Ok(Json(serde_json::Value::Null));
    };

    let conn = state.db.get()?;
    let user = users::get(&conn, &current.id)?.ok_or(AppError::Unauthorized)?;
    let session = conn.query_row(
        "SELECT id, expires_at, created_at FROM session WHERE id = ?1",
        rusqlite::params![current.session_id],
        |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "userId": current.id,
                "expiresAt": row.get::<_, chrono::NaiveDateTime>(1)?,
                "createdAt": row.get::<_, chrono::NaiveDateTime>(2)?,
            }))
        },
    )?;

    Ok(Json(json!({ "session": session, "user": user })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::testing;

    fn config() -> Config {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config
    }

    fn sign_up_form(email: &str) -> UserForm {
        UserForm::SignUp {
            email: email.into(),
            name: "Ada".into(),
            password: "analytical-engine".into(),
            age: Some(36),
        }
    }

    #[test]
    fn cookies_use_configured_name() {
        let config = config();
        assert_eq!(
            session_cookie(&config, "tok"),
            "driftpost_session=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );
        assert!(clear_session_cookie(&config).contains("Max-Age=0"));
    }

    #[test]
    fn register_then_authenticate() {
        let pool = testing::pool();
        let conn = pool.get().unwrap();
        let config = config();
        let client = ClientInfo::default();

        let (user, token) = register(&conn, &config, &sign_up_form("ada@example.com"), &client).unwrap();
        assert!(session::find_session(&conn, &token).unwrap().is_some());

        let sign_in = UserForm::SignIn {
            email: "ada@example.com".into(),
            password: "analytical-engine".into(),
        };
        let (again, _) = authenticate(&conn, &config, &sign_in, &client).unwrap();
        assert_eq!(again.id, user.id);
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let pool = testing::pool();
        let conn = pool.get().unwrap();
        let config = config();
        let client = ClientInfo::default();
        register(&conn, &config, &sign_up_form("ada@example.com"), &client).unwrap();

        let sign_in = UserForm::SignIn {
            email: "ada@example.com".into(),
            password: "difference-engine".into(),
        };
        assert!(matches!(
            authenticate(&conn, &config, &sign_in, &client).unwrap_err(),
            AppError::Unauthorized
        ));
    }

    #[test]
    fn register_validates_before_hashing() {
        let pool = testing::pool();
        let conn = pool.get().unwrap();
        let err = register(
            &conn,
            &config(),
            &sign_up_form("not-an-email"),
            &ClientInfo::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
