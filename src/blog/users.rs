use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::validation::{UserForm, Validate};

pub const CREDENTIAL_PROVIDER: &str = "credential";

/// What `getUser` exposes about another user.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

const USER_EXISTS: &str = "User already exists";

/// A concurrent sign-up can still hit the unique email index after the lookup.
fn duplicate_email(e: rusqlite::Error) -> AppError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(USER_EXISTS.into())
        }
        other => other.into(),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM user WHERE id = ?1", User::COLUMNS),
            params![id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_public(conn: &Connection, id: &str) -> AppResult<Option<PublicUser>> {
    let user = conn
        .query_row(
            "SELECT id, name, email FROM user WHERE id = ?1",
            params![id],
            |row| {
                Ok(PublicUser {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn list(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM user ORDER BY created_at DESC, rowid DESC",
        User::COLUMNS
    ))?;
    let users = stmt
        .query_map([], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// A user and the password hash from their credential account, looked up by email.
pub fn find_credentials(conn: &Connection, email: &str) -> AppResult<Option<(User, String)>> {
    let user = conn
        .query_row(
            &format!(
                "SELECT {} FROM user WHERE email = ?1",
                User::COLUMNS
            ),
            params![normalize_email(email)],
            User::from_row,
        )
        .optional()?;
    let Some(user) = user else {
        return Ok(None);
    };

    let hash: Option<String> = conn
        .query_row(
            "SELECT password FROM account
             WHERE user_id = ?1 AND provider_id = ?2 AND password IS NOT NULL",
            params![user.id, CREDENTIAL_PROVIDER],
            |row| row.get(0),
        )
        .optional()?;

    Ok(hash.map(|hash| (user, hash)))
}

/// Inserts a user and their credential account. `password_hash` must already be hashed.
pub fn create_with_password(
    conn: &Connection,
    name: &str,
    email: &str,
    age: Option<i64>,
    password_hash: &str,
) -> AppResult<User> {
    let email = normalize_email(email);
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM user WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::Conflict(USER_EXISTS.into()));
    }

    let user_id = uuid::Uuid::now_v7().to_string();
    let account_id = uuid::Uuid::now_v7().to_string();

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO user (id, name, email, age) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, name.trim(), email, age],
    )
    .map_err(duplicate_email)?;
    tx.execute(
        "INSERT INTO account (id, account_id, provider_id, user_id, password)
         VALUES (?1, ?2, ?3, ?2, ?4)",
        params![account_id, user_id, CREDENTIAL_PROVIDER, password_hash],
    )?;
    tx.commit()?;

    tracing::info!(user_id = %user_id, "User registered");
    get(conn, &user_id)?.ok_or(AppError::NotFound)
}

/// Updates name and age of the signed-in user. The form must target that same user.
pub fn update_profile(conn: &Connection, session_user_id: &str, form: &UserForm) -> AppResult<User> {
    let UserForm::Update { id, name, age } = form else {
        return Err(AppError::BadRequest(
            "Mode must be 'update' for user updates".into(),
        ));
    };
    form.validate()?;

    if id != session_user_id {
        return Err(AppError::Forbidden(
            "You can only update your own profile".into(),
        ));
    }

    let updated = conn.execute(
        "UPDATE user SET name = ?1, age = ?2, updated_at = datetime('now') WHERE id = ?3",
        params![name.trim(), age, session_user_id],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %session_user_id, "Profile updated");
    get(conn, session_user_id)?.ok_or(AppError::NotFound)
}
