use askama::Template;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;

use super::{format_relative_time, page_base, sign_in_redirect, Html, PostCard};
use crate::blog::{categories, posts, tags, users};
use crate::db::models::CategoryWithCount;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::pagination::{PageQuery, Pager};
use crate::state::AppState;
use crate::validation::{PostForm, PostMode};

// -- Templates --

pub struct UserRow {
    pub name: String,
    pub email: String,
    pub age: String,
    pub joined: String,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    user: Option<CurrentUser>,
    post_count: i64,
    categories: Vec<CategoryWithCount>,
    users: Vec<UserRow>,
}

#[derive(Template)]
#[template(path = "admin/posts.html")]
struct PostsTemplate {
    user: Option<CurrentUser>,
    posts: Vec<PostCard>,
    pager: Pager,
    page_base: String,
}

/// A category or tag in a form picker.
pub struct Choice {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "admin/post_form.html")]
struct PostFormTemplate {
    user: Option<CurrentUser>,
    heading: &'static str,
    action: String,
    form: PostFields,
    categories: Vec<Choice>,
    tags: Vec<Choice>,
    errors: Vec<String>,
}

/// Raw post form fields as submitted by the editor.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub category_id: String,
    pub tag_ids: Vec<String>,
}

impl PostFields {
    /// Parses an urlencoded body. `tag_ids` may repeat, one entry per checked box.
    pub fn parse(body: &[u8]) -> Self {
        let mut fields = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "title" => fields.title = value.into_owned(),
                "short_description" => fields.short_description = value.into_owned(),
                "content" => fields.content = value.into_owned(),
                "category_id" => fields.category_id = value.into_owned(),
                "tag_ids" => fields.tag_ids.push(value.into_owned()),
                _ => {}
            }
        }
        fields
    }

    fn into_form(self, mode: PostMode, id: Option<String>) -> PostForm {
        PostForm {
            mode,
            id,
            title: self.title,
            short_description: self.short_description,
            content: self.content,
            category_id: self.category_id,
            tag_ids: self.tag_ids,
        }
    }
}

fn post_form_page(
    conn: &Connection,
    user: CurrentUser,
    action: String,
    form: PostFields,
    errors: Vec<String>,
) -> AppResult<PostFormTemplate> {
    let categories = categories::list(conn)?
        .into_iter()
        .map(|c| Choice {
            selected: c.id == form.category_id,
            id: c.id,
            name: c.name,
        })
        .collect();
    let tags = tags::list(conn)?
        .into_iter()
        .map(|t| Choice {
            selected: form.tag_ids.contains(&t.id),
            id: t.id,
            name: t.name,
        })
        .collect();

    Ok(PostFormTemplate {
        user: Some(user),
        heading: if action == "/admin/posts" {
            "New post"
        } else {
            "Edit post"
        },
        action,
        form,
        categories,
        tags,
        errors,
    })
}

// -- Handlers --

/// GET /admin
async fn dashboard(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let conn = state.db.get()?;
    let post_count = posts::count_by_user(&conn, &user.id)?;
    let categories = categories::list_with_post_counts(&conn)?;
    let users = users::list(&conn)?
        .into_iter()
        .map(|u| UserRow {
            age: u.age.map(|a| a.to_string()).unwrap_or_default(),
            joined: format_relative_time(&u.created_at),
            name: u.name,
            email: u.email,
        })
        .collect();

    Ok(Html(DashboardTemplate {
        user: Some(user),
        post_count,
        categories,
        users,
    })
    .into_response())
}

/// GET /admin/posts (`?page=`)
async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let page = query.request(&state.config.blog);
    let conn = state.db.get()?;
    let total = posts::count_by_user(&conn, &user.id)?;
    let posts = posts::list_by_user(&conn, &user.id, page)?;

    Ok(Html(PostsTemplate {
        user: Some(user),
        posts: posts.into_iter().map(PostCard::from).collect(),
        pager: Pager::new(page.page, total, page.limit),
        page_base: page_base("/admin/posts", ""),
    })
    .into_response())
}

/// GET /admin/posts/new
async fn new_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let conn = state.db.get()?;
    let page = post_form_page(
        &conn,
        user,
        "/admin/posts".to_string(),
        PostFields::default(),
        Vec::new(),
    )?;
    Ok(Html(page).into_response())
}

/// POST /admin/posts
async fn create_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    body: Bytes,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let fields = PostFields::parse(&body);
    let conn = state.db.get()?;

    match posts::create(&conn, &user.id, &fields.clone().into_form(PostMode::Create, None)) {
        Ok(id) => Ok(Redirect::to(&format!("/posts/{}", id)).into_response()),
        Err(AppError::Validation(errors)) => {
            let page = post_form_page(
                &conn,
                user,
                "/admin/posts".to_string(),
                fields,
                errors.messages(),
            )?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// GET /admin/posts/{id}
async fn edit_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let conn = state.db.get()?;
    posts::authorize_owner(&conn, &id, &user.id, "edit")?;
    let post = posts::get(&conn, &id)?.ok_or(AppError::NotFound)?;

    let fields = PostFields {
        title: post.title,
        short_description: post.short_description,
        content: post.content,
        category_id: post.category_id,
        tag_ids: tags::ids_for_post(&conn, &id)?,
    };
    let page = post_form_page(&conn, user, format!("/admin/posts/{}", id), fields, Vec::new())?;
    Ok(Html(page).into_response())
}

/// POST /admin/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let fields = PostFields::parse(&body);
    let form = fields.clone().into_form(PostMode::Edit, Some(id.clone()));
    let conn = state.db.get()?;

    match posts::update(&conn, &user.id, &form) {
        Ok(()) => Ok(Redirect::to(&format!("/posts/{}", id)).into_response()),
        Err(AppError::Validation(errors)) => {
            let page = post_form_page(
                &conn,
                user,
                format!("/admin/posts/{}", id),
                fields,
                errors.messages(),
            )?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// POST /admin/posts/{id}/delete
async fn delete_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let conn = state.db.get()?;
    posts::delete(&conn, &user.id, &id)?;
    Ok(Redirect::to("/admin/posts").into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/posts", get(list_posts).post(create_post))
        .route("/admin/posts/new", get(new_post))
        .route("/admin/posts/{id}", get(edit_post).post(update_post))
        .route("/admin/posts/{id}/delete", post(delete_post))
}
