use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Session, User};

/// Request metadata recorded alongside a new session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(
    conn: &Connection,
    user_id: &str,
    hours: u64,
    client: &ClientInfo,
) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO session (id, user_id, token, expires_at, ip_address, user_agent)
         VALUES (?1, ?2, ?3, datetime('now', ?4), ?5, ?6)",
        params![
            id,
            user_id,
            token,
            format!("+{} hours", hours),
            client.ip_address,
            client.user_agent
        ],
    )?;

    Ok(token)
}

/// Look up an unexpired session and its user.
pub fn find_session(
    conn: &Connection,
    token: &str,
) -> Result<Option<(Session, User)>, rusqlite::Error> {
    conn.query_row(
        "SELECT s.id, s.user_id, s.token, s.expires_at, s.created_at, s.ip_address, s.user_agent,
                u.id, u.name, u.email, u.email_verified, u.image, u.age, u.created_at, u.updated_at
         FROM session s
         JOIN user u ON u.id = s.user_id
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            let session = Session {
                id: row.get(0)?,
                user_id: row.get(1)?,
                token: row.get(2)?,
                expires_at: row.get(3)?,
                created_at: row.get(4)?,
                ip_address: row.get(5)?,
                user_agent: row.get(6)?,
            };
            let user = User {
                id: row.get(7)?,
                name: row.get(8)?,
                email: row.get(9)?,
                email_verified: row.get(10)?,
                image: row.get(11)?,
                age: row.get(12)?,
                created_at: row.get(13)?,
                updated_at: row.get(14)?,
            };
            Ok((session, user))
        },
    )
    .optional()
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM session WHERE token = ?1", params![token])?;
    Ok(())
}

/// Remove expired sessions and verification records. Returns the number of rows deleted.
pub fn purge_expired(conn: &Connection) -> Result<usize, rusqlite::Error> {
    let sessions = conn.execute(
        "DELETE FROM session WHERE expires_at <= datetime('now')",
        [],
    )?;
    let verifications = conn.execute(
        "DELETE FROM verification WHERE expires_at <= datetime('now')",
        [],
    )?;
    Ok(sessions + verifications)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
