use std::collections::{HashMap, HashSet};

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use super::{format_relative_time, page_base, sign_in_redirect, Html, PostCard};
use crate::blog::{categories, comments, posts};
use crate::db::models::{Category, CategoryWithCount, CommentWithAuthor, PostDetail, PostSummary};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::pagination::{PageQuery, Pager};
use crate::state::AppState;
use crate::validation::CommentForm;

const EXCERPT_CHARS: usize = 40;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomeTemplate {
    user: Option<CurrentUser>,
    posts: Vec<PostCard>,
    categories: Vec<CategoryWithCount>,
    search: String,
    pager: Pager,
    page_base: String,
}

#[derive(Template)]
#[template(path = "pages/category.html")]
struct CategoryTemplate {
    user: Option<CurrentUser>,
    category: Category,
    total: i64,
    posts: Vec<PostCard>,
    pager: Pager,
    page_base: String,
}

/// A comment placed in reading order, replies directly under their parent.
pub struct CommentView {
    pub id: String,
    pub author: String,
    pub content: String,
    pub excerpt: String,
    pub posted: String,
    pub is_reply: bool,
}

impl CommentView {
    fn new(c: &CommentWithAuthor, is_reply: bool) -> Self {
        Self {
            id: c.comment.id.clone(),
            author: c.user.name.clone(),
            content: c.comment.content.clone(),
            excerpt: c.comment.content.chars().take(EXCERPT_CHARS).collect(),
            posted: format_relative_time(&c.comment.created_at),
            is_reply,
        }
    }
}

#[derive(Template)]
#[template(path = "pages/post.html")]
struct PostTemplate {
    user: Option<CurrentUser>,
    post: PostDetail,
    published: String,
    comments: Vec<CommentView>,
    related: Vec<PostSummary>,
    errors: Vec<String>,
    draft: String,
}

#[derive(Deserialize)]
pub struct CommentFields {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

// -- Handlers --

/// GET / (newest posts, `?page=&search=`)
async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let page = query.request(&state.config.blog);
    let search = query.search_term().to_string();

    let conn = state.db.get()?;
    let total = posts::count(&conn, &search)?;
    let posts = posts::list(&conn, page, &search)?;
    let categories = categories::list_with_post_counts(&conn)?;

    Ok(Html(HomeTemplate {
        user,
        posts: posts.into_iter().map(PostCard::from).collect(),
        categories,
        pager: Pager::new(page.page, total, page.limit),
        page_base: page_base("/", &search),
        search,
    })
    .into_response())
}

/// GET /categories/{id}
async fn category(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let page = query.request(&state.config.blog);

    let conn = state.db.get()?;
    let category = categories::get(&conn, &id)?.ok_or(AppError::NotFound)?;
    let total = categories::post_count(&conn, &id)?;
    let posts = posts::list_by_category(&conn, &id, page)?;

    Ok(Html(CategoryTemplate {
        user,
        page_base: page_base(&format!("/categories/{}", category.id), ""),
        category,
        total,
        posts: posts.into_iter().map(PostCard::from).collect(),
        pager: Pager::new(page.page, total, page.limit),
    })
    .into_response())
}

fn render_post(
    conn: &rusqlite::Connection,
    user: Option<CurrentUser>,
    id: &str,
    errors: Vec<String>,
    draft: String,
) -> AppResult<PostTemplate> {
    let post = posts::get_detail(conn, id)?.ok_or(AppError::NotFound)?;
    let related = posts::related_by_category(conn, &post.post.category_id, Some(id))?;
    Ok(PostTemplate {
        user,
        published: format_relative_time(&post.post.created_at),
        comments: thread(&post.comments),
        post,
        related,
        errors,
        draft,
    })
}

/// GET /posts/{id}
async fn show_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let page = render_post(&conn, user, &id, Vec::new(), String::new())?;
    Ok(Html(page).into_response())
}

/// POST /posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    Form(fields): Form<CommentFields>,
) -> AppResult<Response> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };

    let form = CommentForm {
        post_id: id.clone(),
        content: fields.content,
        parent_id: fields.parent_id,
    };
    let conn = state.db.get()?;
    match comments::create(&conn, &user.id, &form) {
        Ok(comment_id) => {
            Ok(Redirect::to(&format!("/posts/{}#comment-{}", id, comment_id)).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let page = render_post(&conn, Some(user), &id, errors.messages(), form.content)?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(AppError::BadRequest(message)) => {
            let page = render_post(&conn, Some(user), &id, vec![message], form.content)?;
            Ok((StatusCode::BAD_REQUEST, Html(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Orders comments so each reply follows its parent. Comments whose parent is
/// missing are shown as top-level. Walks with an explicit stack so reply depth
/// is bounded only by memory.
fn thread(comments: &[CommentWithAuthor]) -> Vec<CommentView> {
    let mut children: HashMap<Option<&str>, Vec<usize>> = HashMap::new();
    for (idx, c) in comments.iter().enumerate() {
        children
            .entry(c.comment.parent_id.as_deref())
            .or_default()
            .push(idx);
    }

    let mut out = Vec::with_capacity(comments.len());
    let mut visited = vec![false; comments.len()];
    let mut stack: Vec<(usize, bool)> = Vec::new();

    let ids: HashSet<&str> = comments.iter().map(|c| c.comment.id.as_str()).collect();
    let roots = children.get(&None).cloned().unwrap_or_default();
    // Orphans: parent id set but the parent is not on this post
    let orphans = comments.iter().enumerate().filter_map(|(idx, c)| {
        c.comment
            .parent_id
            .as_deref()
            .filter(|p| !ids.contains(p))
            .map(|_| idx)
    });
    // Anything left over sits in a parent cycle
    let remaining = 0..comments.len();

    for root in roots.into_iter().chain(orphans).chain(remaining) {
        stack.push((root, false));
        while let Some((idx, is_reply)) = stack.pop() {
            if std::mem::replace(&mut visited[idx], true) {
                continue;
            }
            let c = &comments[idx];
            out.push(CommentView::new(c, is_reply));
            if let Some(replies) = children.get(&Some(c.comment.id.as_str())) {
                stack.extend(replies.iter().rev().map(|&r| (r, true)));
            }
        }
    }
    out
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/posts/{id}", get(show_post))
        .route("/posts/{id}/comments", post(create_comment))
        .route("/categories/{id}", get(category))
}
