use async_graphql::*;

use crate::blog::{comments, posts, users};
use crate::error::AppError;
use crate::graphql::types::{CommentInput, MutationResult, PostInput, User, UserInput};
use crate::graphql::{conn, require_user, IntoGql};
use crate::validation::{require_id, PostForm, UserForm};

/// GraphQL Mutation root. Every mutation requires a signed-in user.
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Comment on a post, optionally replying to another comment
    async fn create_comment(&self, ctx: &Context<'_>, input: CommentInput) -> Result<MutationResult> {
        let user = require_user(ctx)?;
        let conn = conn(ctx)?;
        let id = comments::create(&conn, &user.id, &input.into()).gql()?;
        Ok(MutationResult::ok("comment created successfully!", Some(id)))
    }

    /// Update the signed-in user's name and age
    async fn update_user(&self, ctx: &Context<'_>, input: UserInput) -> Result<User> {
        let user = require_user(ctx)?;
        let form: UserForm = input.into();
        let conn = conn(ctx)?;
        let updated = users::update_profile(&conn, &user.id, &form).gql()?;
        Ok(updated.into())
    }

    /// Delete one of the signed-in user's posts, with its tags and comments
    async fn delete_post_by_id(&self, ctx: &Context<'_>, id: String) -> Result<MutationResult> {
        let user = require_user(ctx)?;
        require_id("id", &id).map_err(AppError::from).gql()?;
        let conn = conn(ctx)?;
        posts::delete(&conn, &user.id, &id).gql()?;
        Ok(MutationResult::ok("post was deleted!", Some(id)))
    }

    /// Create a post owned by the signed-in user
    async fn create_post(&self, ctx: &Context<'_>, input: PostInput) -> Result<MutationResult> {
        let user = require_user(ctx)?;
        let conn = conn(ctx)?;
        let id = posts::create(&conn, &user.id, &input.into()).gql()?;
        Ok(MutationResult::ok("Post created successfully!", Some(id)))
    }

    /// Edit one of the signed-in user's posts
    async fn update_post(&self, ctx: &Context<'_>, input: PostInput) -> Result<MutationResult> {
        let user = require_user(ctx)?;
        let form: PostForm = input.into();
        let conn = conn(ctx)?;
        posts::update(&conn, &user.id, &form).gql()?;
        Ok(MutationResult::ok("Post updated successfully!", form.id))
    }
}
