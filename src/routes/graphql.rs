use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;

use crate::extractors::MaybeUser;
use crate::state::AppState;

/// GraphQL endpoint handler. Queries are public; mutations check for a session themselves.
async fn graphql_handler(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let mut request = req.data(state.db.clone());
    if let Some(user) = user {
        request = request.data(user);
    }

    let response = state.graphql_schema.execute(request).await;
    Json(response)
}

/// GraphQL Playground UI (development tool)
async fn graphql_playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/api/graphql")))
}

/// GraphQL router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/graphql", post(graphql_handler))
        .route("/api/graphql/playground", get(graphql_playground))
}
