pub mod mutations;
pub mod queries;
pub mod schema;
pub mod types;

use async_graphql::{Context, ErrorExtensions};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::DbPool;

pub use schema::{build_schema, BlogSchema};

/// Turns an `AppError` into a GraphQL error carrying `extensions.code`.
pub(crate) trait IntoGql<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> IntoGql<T> for AppResult<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

pub(crate) fn conn(
    ctx: &Context<'_>,
) -> async_graphql::Result<PooledConnection<SqliteConnectionManager>> {
    let pool = ctx.data::<DbPool>()?;
    pool.get().map_err(AppError::from).gql()
}

/// The signed-in user, or an `UNAUTHORIZED` error for anonymous requests.
pub(crate) fn require_user<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a CurrentUser> {
    ctx.data_opt::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthorized.extend())
}
