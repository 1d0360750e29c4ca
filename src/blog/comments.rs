use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Author, Comment, CommentWithAuthor};
use crate::error::{AppError, AppResult};
use crate::validation::{CommentForm, Validate};

/// Adds a comment by `user_id`. A parent comment, when given, must sit on the same post.
pub fn create(conn: &Connection, user_id: &str, form: &CommentForm) -> AppResult<String> {
    form.validate()?;

    let post_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM post WHERE id = ?1",
        params![form.post_id],
        |row| row.get(0),
    )?;
    if !post_exists {
        return Err(AppError::NotFound);
    }

    let parent_id = form
        .parent_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if let Some(parent_id) = parent_id {
        let parent_post: Option<String> = conn
            .query_row(
                "SELECT post_id FROM comment WHERE id = ?1",
                params![parent_id],
                |row| row.get(0),
            )
            .optional()?;
        match parent_post {
            None => return Err(AppError::BadRequest("Parent comment does not exist".into())),
            Some(post_id) if post_id != form.post_id => {
                return Err(AppError::BadRequest(
                    "Parent comment belongs to another post".into(),
                ))
            }
            Some(_) => {}
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO comment (id, parent_id, user_id, post_id, content) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, parent_id, user_id, form.post_id, form.content.trim()],
    )?;

    tracing::info!(comment_id = %id, post_id = %form.post_id, "Comment created");
    Ok(id)
}

/// Comments on a post in the order they were written.
pub fn list_for_post(conn: &Connection, post_id: &str) -> AppResult<Vec<CommentWithAuthor>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.parent_id, c.user_id, c.post_id, c.content, c.created_at, c.updated_at,
                u.name
         FROM comment c
         JOIN user u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.rowid ASC",
    )?;

    let comments = stmt
        .query_map(params![post_id], |row| {
            let comment = Comment {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                user_id: row.get(2)?,
                post_id: row.get(3)?,
                content: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            };
            let user = Author {
                id: comment.user_id.clone(),
                name: row.get(7)?,
            };
            Ok(CommentWithAuthor { comment, user })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}
