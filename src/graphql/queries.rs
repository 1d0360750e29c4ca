use async_graphql::*;

use crate::blog::{categories, posts, tags, users};
use crate::config::BlogConfig;
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::graphql::types::{AuthStatus, Category, Post, PostDetail, PostSummary, PublicUser, Tag};
use crate::graphql::{conn, IntoGql};
use crate::pagination::PageRequest;
use crate::validation::require_id;

fn page_request(ctx: &Context<'_>, page: i64, limit: i64) -> Result<PageRequest> {
    let config = ctx.data::<BlogConfig>()?;
    PageRequest::new(page, limit, config)
        .map_err(AppError::from)
        .gql()
}

fn check_id(field: &str, value: &str) -> Result<()> {
    require_id(field, value).map_err(AppError::from).gql()
}

/// GraphQL Query root. Every query is public.
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All categories, sorted by name
    async fn get_categories(&self, ctx: &Context<'_>) -> Result<Vec<Category>> {
        let conn = conn(ctx)?;
        let categories = categories::list(&conn).gql()?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    /// All tags, sorted by name
    async fn get_tags(&self, ctx: &Context<'_>) -> Result<Vec<Tag>> {
        let conn = conn(ctx)?;
        let tags = tags::list(&conn).gql()?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    /// Up to four posts from the same category
    async fn get_related_posts_by_category_id(
        &self,
        ctx: &Context<'_>,
        category_id: String,
        exclude_id: Option<String>,
    ) -> Result<Vec<PostSummary>> {
        check_id("categoryId", &category_id)?;
        let conn = conn(ctx)?;
        let related = posts::related_by_category(&conn, &category_id, exclude_id.as_deref()).gql()?;
        Ok(related.into_iter().map(Into::into).collect())
    }

    /// Number of posts whose title matches the search term
    async fn get_posts_count(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] search_term: String,
    ) -> Result<i64> {
        let conn = conn(ctx)?;
        posts::count(&conn, &search_term).gql()
    }

    /// One page of posts, newest first. `page` is zero-based.
    async fn get_posts(
        &self,
        ctx: &Context<'_>,
        page: i64,
        limit: i64,
        #[graphql(default)] search_term: String,
    ) -> Result<Vec<Post>> {
        let page = page_request(ctx, page, limit)?;
        let conn = conn(ctx)?;
        let posts = posts::list(&conn, page, &search_term).gql()?;
        Ok(posts.into_iter().map(Into::into).collect())
    }

    async fn get_user_posts_count(&self, ctx: &Context<'_>, user_id: String) -> Result<i64> {
        check_id("userId", &user_id)?;
        let conn = conn(ctx)?;
        posts::count_by_user(&conn, &user_id).gql()
    }

    /// One page of a user's posts, newest first
    async fn get_user_posts(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        page: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        check_id("userId", &user_id)?;
        let page = page_request(ctx, page, limit)?;
        let conn = conn(ctx)?;
        let posts = posts::list_by_user(&conn, &user_id, page).gql()?;
        Ok(posts.into_iter().map(Into::into).collect())
    }

    /// Public profile of a user, or null
    async fn get_user(&self, ctx: &Context<'_>, user_id: String) -> Result<Option<PublicUser>> {
        check_id("userId", &user_id)?;
        let conn = conn(ctx)?;
        Ok(users::get_public(&conn, &user_id).gql()?.map(Into::into))
    }

    /// A post with category, author, tags and comments, or null
    async fn get_post_by_id(&self, ctx: &Context<'_>, id: String) -> Result<Option<PostDetail>> {
        check_id("id", &id)?;
        let conn = conn(ctx)?;
        Ok(posts::get_detail(&conn, &id).gql()?.map(Into::into))
    }

    async fn get_category_posts_count(
        &self,
        ctx: &Context<'_>,
        category_id: String,
    ) -> Result<i64> {
        check_id("categoryId", &category_id)?;
        let conn = conn(ctx)?;
        categories::post_count(&conn, &category_id).gql()
    }

    /// One page of a category's posts, newest first
    async fn get_posts_by_category_id(
        &self,
        ctx: &Context<'_>,
        category_id: String,
        page: i64,
        limit: i64,
    ) -> Result<Vec<PostSummary>> {
        check_id("categoryId", &category_id)?;
        let page = page_request(ctx, page, limit)?;
        let conn = conn(ctx)?;
        let posts = posts::list_by_category(&conn, &category_id, page).gql()?;
        Ok(posts.into_iter().map(Into::into).collect())
    }

    /// Whether the request carries a valid session, and whose
    async fn auth_status(&self, ctx: &Context<'_>) -> Result<AuthStatus> {
        let Some(current) = ctx.data_opt::<CurrentUser>() else {
            return Ok(AuthStatus {
                authenticated: false,
                user: None,
            });
        };
        let conn = conn(ctx)?;
        let user = users::get(&conn, &current.id).gql()?;
        Ok(AuthStatus {
            authenticated: user.is_some(),
            user: user.map(Into::into),
        })
    }
}
