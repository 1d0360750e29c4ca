pub mod account;
pub mod admin;
pub mod assets;
pub mod auth;
pub mod graphql;
pub mod public;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::db::models::{Post, PostSummary};
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/assets/{*path}", get(assets::serve))
        .merge(public::router())
        .merge(account::router())
        .merge(admin::router())
        .merge(auth::router())
        .merge(graphql::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// A post as shown in listings.
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub short_description: String,
    pub updated: String,
}

impl From<Post> for PostCard {
    fn from(p: Post) -> Self {
        Self {
            updated: format_relative_time(&p.updated_at),
            id: p.id,
            title: p.title,
            short_description: p.short_description,
        }
    }
}

impl From<PostSummary> for PostCard {
    fn from(p: PostSummary) -> Self {
        Self {
            updated: format_relative_time(&p.updated_at),
            id: p.id,
            title: p.title,
            short_description: p.short_description,
        }
    }
}

pub fn sign_in_redirect() -> Response {
    Redirect::to("/sign-in").into_response()
}

/// Query-string prefix for pagination links, keeping the current search term.
pub fn page_base(path: &str, search: &str) -> String {
    if search.is_empty() {
        format!("{}?", path)
    } else {
        let encoded: String = url::form_urlencoded::byte_serialize(search.as_bytes()).collect();
        format!("{}?search={}&", path, encoded)
    }
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}
