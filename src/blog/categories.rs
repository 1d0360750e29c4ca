use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Category, CategoryWithCount};
use crate::error::AppResult;

pub fn list(conn: &Connection) -> AppResult<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM category ORDER BY name")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn list_with_post_counts(conn: &Connection) -> AppResult<Vec<CategoryWithCount>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, COUNT(p.id)
         FROM category c
         LEFT JOIN post p ON p.category_id = c.id
         GROUP BY c.id, c.name
         ORDER BY c.name",
    )?;
    let categories = stmt
        .query_map([], |row| {
            Ok(CategoryWithCount {
                id: row.get(0)?,
                name: row.get(1)?,
                post_count: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name FROM category WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(category)
}

pub fn post_count(conn: &Connection, category_id: &str) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM post WHERE category_id = ?1",
        params![category_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::testing;

    #[test]
    fn lists_sorted_by_name_with_counts() {
        let pool = testing::pool();
        let conn = pool.get().unwrap();
        testing::insert_user(&conn, "u1", "Ada");
        testing::insert_category(&conn, "c-py", "Python");
        testing::insert_category(&conn, "c-alg", "Algorithms");
        conn.execute(
            "INSERT INTO post (id, user_id, title, short_description, content, category_id)
             VALUES ('p1', 'u1', 'Sorting', 's', 'c', 'c-alg')",
            [],
        )
        .unwrap();

        let names: Vec<String> = list(&conn).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Algorithms", "Python"]);

        let counts = list_with_post_counts(&conn).unwrap();
        assert_eq!(counts[0].post_count, 1);
        assert_eq!(counts[1].post_count, 0);
        assert_eq!(post_count(&conn, "c-alg").unwrap(), 1);
    }

    #[test]
    fn get_missing_category_is_none() {
        let pool = testing::pool();
        let conn = pool.get().unwrap();
        assert!(get(&conn, "nope").unwrap().is_none());
    }
}
