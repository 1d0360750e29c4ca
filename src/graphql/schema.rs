use async_graphql::{EmptySubscription, Schema};

use super::mutations::MutationRoot;
use super::queries::QueryRoot;
use crate::config::BlogConfig;

/// GraphQL Schema type
pub type BlogSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema. The database pool and session user are attached per request.
pub fn build_schema(config: BlogConfig) -> BlogSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(config)
        .limit_depth(8)
        .finish()
}
