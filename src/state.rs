use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::graphql::BlogSchema;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub graphql_schema: BlogSchema,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let graphql_schema = crate::graphql::build_schema(config.blog.clone());
        Self {
            db,
            config,
            graphql_schema,
        }
    }
}
