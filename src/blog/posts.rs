use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};

use crate::blog::{categories, comments, tags};
use crate::db::models::{Author, Post, PostDetail, PostSummary};
use crate::error::{AppError, AppResult};
use crate::pagination::PageRequest;
use crate::validation::{PostForm, PostMode, Validate, ValidationErrors};

const RELATED_LIMIT: i64 = 4;

/// LIKE pattern matching `term` anywhere in the column, with wildcards in the term taken literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}

fn select_posts(sql_where: &str) -> String {
    format!(
        "SELECT {} FROM post WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        Post::COLUMNS,
        sql_where
    )
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostSummary> {
    Ok(PostSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        short_description: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Newest posts first, filtered by a case-insensitive title search. An empty term matches all.
pub fn list(conn: &Connection, page: PageRequest, search: &str) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(&select_posts("title LIKE ?1 ESCAPE '\\'"))?;
    let posts = stmt
        .query_map(
            params![like_pattern(search), page.limit, page.offset()],
            Post::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn count(conn: &Connection, search: &str) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM post WHERE title LIKE ?1 ESCAPE '\\'",
        params![like_pattern(search)],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM post WHERE id = ?1", Post::COLUMNS),
            params![id],
            Post::from_row,
        )
        .optional()?;
    Ok(post)
}

/// A post with its category, author, tags and comments.
pub fn get_detail(conn: &Connection, id: &str) -> AppResult<Option<PostDetail>> {
    let Some(post) = get(conn, id)? else {
        return Ok(None);
    };

    let category = categories::get(conn, &post.category_id)?.ok_or_else(|| {
        AppError::Internal(format!("post {} references a missing category", post.id))
    })?;
    let user = conn.query_row(
        "SELECT id, name FROM user WHERE id = ?1",
        params![post.user_id],
        |row| {
            Ok(Author {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )?;
    let tags = tags::for_post(conn, &post.id)?;
    let comments = comments::list_for_post(conn, &post.id)?;

    Ok(Some(PostDetail {
        post,
        category,
        user,
        tags,
        comments,
    }))
}

pub fn list_by_user(conn: &Connection, user_id: &str, page: PageRequest) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(&select_posts("user_id = ?1"))?;
    let posts = stmt
        .query_map(params![user_id, page.limit, page.offset()], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn count_by_user(conn: &Connection, user_id: &str) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM post WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_by_category(
    conn: &Connection,
    category_id: &str,
    page: PageRequest,
) -> AppResult<Vec<PostSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, short_description, updated_at FROM post
         WHERE category_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2 OFFSET ?3",
    )?;
    let posts = stmt
        .query_map(
            params![category_id, page.limit, page.offset()],
            summary_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Up to four other posts in the same category, newest first.
pub fn related_by_category(
    conn: &Connection,
    category_id: &str,
    exclude_post_id: Option<&str>,
) -> AppResult<Vec<PostSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, short_description, updated_at FROM post
         WHERE category_id = ?1 AND id != ?2
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?3",
    )?;
    let posts = stmt
        .query_map(
            params![category_id, exclude_post_id.unwrap_or(""), RELATED_LIMIT],
            summary_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Checks that the category and every tag the form names exist.
fn check_references(conn: &Connection, form: &PostForm, tag_ids: &[String]) -> AppResult<()> {
    let mut errors = ValidationErrors::default();
    if categories::get(conn, &form.category_id)?.is_none() {
        errors.add("categoryId", "Category does not exist");
    }
    for id in tags::missing(conn, tag_ids)? {
        errors.add("tagIds", format!("Tag {} does not exist", id));
    }
    Ok(errors.into_result()?)
}

/// Creates a post owned by `user_id`. Returns the new post id.
pub fn create(conn: &Connection, user_id: &str, form: &PostForm) -> AppResult<String> {
    if form.mode != PostMode::Create {
        return Err(AppError::BadRequest(
            "Mode must be 'create' for new posts".into(),
        ));
    }
    form.validate()?;
    let tag_ids = form.normalized_tag_ids();
    check_references(conn, form, &tag_ids)?;

    let post_id = uuid::Uuid::now_v7().to_string();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO post (id, user_id, title, short_description, content, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            post_id,
            user_id,
            form.title.trim(),
            form.short_description.trim(),
            form.content,
            form.category_id
        ],
    )?;
    insert_tags(&tx, &post_id, &tag_ids)?;
    tx.commit()?;

    tracing::info!(post_id = %post_id, user_id = %user_id, "Post created");
    Ok(post_id)
}

/// Loads the owner of a post and checks it against the acting user.
pub fn authorize_owner(conn: &Connection, post_id: &str, user_id: &str, action: &str) -> AppResult<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT user_id FROM post WHERE id = ?1",
            params![post_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        None => Err(AppError::NotFound),
        Some(owner) if owner != user_id => Err(AppError::Forbidden(format!(
            "You can only {} your own posts",
            action
        ))),
        Some(_) => Ok(()),
    }
}

/// Edits a post the user owns. Tags are rewritten only when the set changed.
pub fn update(conn: &Connection, user_id: &str, form: &PostForm) -> AppResult<()> {
    if form.mode != PostMode::Edit {
        return Err(AppError::BadRequest(
            "Mode must be 'edit' for post updates".into(),
        ));
    }
    form.validate()?;
    let post_id = form.id.as_deref().unwrap_or_default().trim();
    authorize_owner(conn, post_id, user_id, "update")?;

    let tag_ids = form.normalized_tag_ids();
    check_references(conn, form, &tag_ids)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE post
         SET title = ?1, short_description = ?2, content = ?3, category_id = ?4,
             updated_at = datetime('now')
         WHERE id = ?5",
        params![
            form.title.trim(),
            form.short_description.trim(),
            form.content,
            form.category_id,
            post_id
        ],
    )?;
    let tags_changed = replace_tags(&tx, post_id, &tag_ids)?;
    tx.commit()?;

    tracing::info!(post_id = %post_id, tags_changed, "Post updated");
    Ok(())
}

/// Deletes a post the user owns, together with its tag links and comments.
pub fn delete(conn: &Connection, user_id: &str, post_id: &str) -> AppResult<()> {
    authorize_owner(conn, post_id, user_id, "delete")?;

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM post_tag WHERE post_id = ?1", params![post_id])?;
    tx.execute("DELETE FROM comment WHERE post_id = ?1", params![post_id])?;
    tx.execute("DELETE FROM post WHERE id = ?1", params![post_id])?;
    tx.commit()?;

    tracing::info!(post_id = %post_id, "Post deleted");
    Ok(())
}

pub fn tags_changed(existing: &[String], new: &[String]) -> bool {
    let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let new: HashSet<&str> = new.iter().map(String::as_str).collect();
    existing != new
}

fn insert_tags(conn: &Connection, post_id: &str, tag_ids: &[String]) -> AppResult<()> {
    let mut stmt = conn.prepare("INSERT INTO post_tag (post_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tag_ids {
        stmt.execute(params![post_id, tag_id])?;
    }
    Ok(())
}

/// Replaces a post's tag set when it differs from `tag_ids`. Returns whether anything was rewritten.
pub fn replace_tags(conn: &Connection, post_id: &str, tag_ids: &[String]) -> AppResult<bool> {
    let existing = tags::ids_for_post(conn, post_id)?;
    if !tags_changed(&existing, tag_ids) {
        return Ok(false);
    }

    conn.execute("DELETE FROM post_tag WHERE post_id = ?1", params![post_id])?;
    insert_tags(conn, post_id, tag_ids)?;
    Ok(true)
}
