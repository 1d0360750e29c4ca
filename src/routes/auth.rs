use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-up/email", post(handlers::sign_up_email))
        .route("/api/auth/sign-in/email", post(handlers::sign_in_email))
        .route("/api/auth/sign-out", post(handlers::sign_out))
        .route("/api/auth/get-session", get(handlers::get_session))
}
