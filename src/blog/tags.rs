use rusqlite::{params, Connection};

use crate::db::models::Tag;
use crate::error::AppResult;

pub fn list(conn: &Connection) -> AppResult<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tag ORDER BY name")?;
    let tags = stmt
        .query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub fn for_post(conn: &Connection, post_id: &str) -> AppResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name
         FROM post_tag pt
         JOIN tag t ON t.id = pt.tag_id
         WHERE pt.post_id = ?1
         ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map(params![post_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Tag ids currently attached to a post, in no particular order.
pub fn ids_for_post(conn: &Connection, post_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT tag_id FROM post_tag WHERE post_id = ?1")?;
    let ids = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Returns the ids from `ids` that have no tag row.
pub fn missing(conn: &Connection, ids: &[String]) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT COUNT(*) > 0 FROM tag WHERE id = ?1")?;
    let mut missing = Vec::new();
    for id in ids {
        let exists: bool = stmt.query_row(params![id], |row| row.get(0))?;
        if !exists {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}
