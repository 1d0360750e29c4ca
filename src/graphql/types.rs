use async_graphql::*;
use chrono::NaiveDateTime;

use crate::blog;
use crate::db::models;
use crate::graphql::{conn, IntoGql};
use crate::validation::{self, CommentForm, PostForm, UserForm};

/// A post category
#[derive(Clone, Debug, SimpleObject)]
#[graphql(complex)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[ComplexObject]
impl Category {
    /// Number of posts filed under this category
    async fn post_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let conn = conn(ctx)?;
        blog::categories::post_count(&conn, &self.id).gql()
    }
}

impl From<models::Category> for Category {
    fn from(c: models::Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

impl From<models::Tag> for Tag {
    fn from(t: models::Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}

/// Full user record. Only returned to the user themselves.
#[derive(Clone, Debug, SimpleObject)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub age: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<models::User> for User {
    fn from(u: models::User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            email_verified: u.email_verified,
            image: u.image,
            age: u.age,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<blog::users::PublicUser> for PublicUser {
    fn from(u: blog::users::PublicUser) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl From<models::Author> for Author {
    fn from(a: models::Author) -> Self {
        Self {
            id: a.id,
            name: a.name,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub category_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<models::Post> for Post {
    fn from(p: models::Post) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            title: p.title,
            short_description: p.short_description,
            content: p.content,
            category_id: p.category_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub short_description: String,
    pub updated_at: NaiveDateTime,
}

impl From<models::PostSummary> for PostSummary {
    fn from(p: models::PostSummary) -> Self {
        Self {
            id: p.id,
            title: p.title,
            short_description: p.short_description,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct Comment {
    pub id: String,
    pub parent_id: Option<String>,
    pub user_id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub user: Author,
}

impl From<models::CommentWithAuthor> for Comment {
    fn from(c: models::CommentWithAuthor) -> Self {
        Self {
            id: c.comment.id,
            parent_id: c.comment.parent_id,
            user_id: c.comment.user_id,
            post_id: c.comment.post_id,
            content: c.comment.content,
            created_at: c.comment.created_at,
            updated_at: c.comment.updated_at,
            user: c.user.into(),
        }
    }
}

/// A post with its category, author, tags and comments
#[derive(Clone, Debug, SimpleObject)]
pub struct PostDetail {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub category_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub category: Category,
    pub user: Author,
    pub tags: Vec<Tag>,
    pub comments: Vec<Comment>,
}

impl From<models::PostDetail> for PostDetail {
    fn from(d: models::PostDetail) -> Self {
        Self {
            id: d.post.id,
            user_id: d.post.user_id,
            title: d.post.title,
            short_description: d.post.short_description,
            content: d.post.content,
            category_id: d.post.category_id,
            created_at: d.post.created_at,
            updated_at: d.post.updated_at,
            category: d.category.into(),
            user: d.user.into(),
            tags: d.tags.into_iter().map(Into::into).collect(),
            comments: d.comments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(SimpleObject)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub user: Option<User>,
}

/// Result of a mutation
#[derive(SimpleObject)]
pub struct MutationResult {
    pub success: bool,
    pub message: String,
    /// Id of the created or affected record
    pub id: Option<String>,
}

impl MutationResult {
    pub fn ok(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            id,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum PostMode {
    Create,
    Edit,
}

#[derive(InputObject)]
pub struct PostInput {
    pub mode: PostMode,
    /// Required when editing
    pub id: Option<String>,
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub category_id: String,
    #[graphql(default)]
    pub tag_ids: Vec<String>,
}

impl From<PostInput> for PostForm {
    fn from(input: PostInput) -> Self {
        Self {
            mode: match input.mode {
                PostMode::Create => validation::PostMode::Create,
                PostMode::Edit => validation::PostMode::Edit,
            },
            id: input.id,
            title: input.title,
            short_description: input.short_description,
            content: input.content,
            category_id: input.category_id,
            tag_ids: input.tag_ids,
        }
    }
}

#[derive(Clone, Copy, Debug, Enum, Eq, PartialEq)]
pub enum UserMode {
    SignUp,
    SignIn,
    Update,
}

/// User form; which fields matter depends on `mode`
#[derive(InputObject)]
pub struct UserInput {
    pub mode: UserMode,
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
}

impl From<UserInput> for UserForm {
    fn from(input: UserInput) -> Self {
        match input.mode {
            UserMode::SignUp => UserForm::SignUp {
                email: input.email.unwrap_or_default(),
                name: input.name.unwrap_or_default(),
                password: input.password.unwrap_or_default(),
                age: input.age,
            },
            UserMode::SignIn => UserForm::SignIn {
                email: input.email.unwrap_or_default(),
                password: input.password.unwrap_or_default(),
            },
            UserMode::Update => UserForm::Update {
                id: input.id.unwrap_or_default(),
                name: input.name.unwrap_or_default(),
                age: input.age,
            },
        }
    }
}

#[derive(InputObject)]
pub struct CommentInput {
    pub post_id: String,
    pub content: String,
    pub parent_id: Option<String>,
}

impl From<CommentInput> for CommentForm {
    fn from(input: CommentInput) -> Self {
        Self {
            post_id: input.post_id,
            content: input.content,
            parent_id: input.parent_id,
        }
    }
}
