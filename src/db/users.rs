use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::auth::password;
use crate::config::AdminSeed;
use crate::db::models::{Role, User};
use crate::state::DbPool;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert(conn: &Connection, new: NewUser<'_>) -> rusqlite::Result<User> {
    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        username: new.username.to_string(),
        email: new.email.to_string(),
        password_hash: new.password_hash.to_string(),
        role: new.role,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.role,
            user.created_at
        ],
    )?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        from_row,
    )
    .optional()
}

pub fn exists_with_email_or_username(
    conn: &Connection,
    email: &str,
    username: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1 OR username = ?2",
        params![email, username],
        |row| row.get(0),
    )
}

pub fn list_all(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
    ))?;
    let users = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

/// Returns false when no row matched.
pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// What startup did with the `[admin]` seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
    /// The username or email belongs to a non-admin account; nothing was created.
    Conflict,
}

/// Create the configured bootstrap admin unless it already exists.
pub fn ensure_admin(pool: &DbPool, seed: &AdminSeed, bcrypt_cost: u32) -> anyhow::Result<SeedOutcome> {
    let conn = pool.get()?;
    if let Some(existing) = find_by_email(&conn, &seed.email)? {
        if existing.role == Role::Admin && existing.username == seed.username {
            tracing::debug!("Bootstrap admin {} already present", seed.username);
            return Ok(SeedOutcome::AlreadyPresent);
        }
    }
    if exists_with_email_or_username(&conn, &seed.email, &seed.username)? {
        tracing::warn!(
            "Bootstrap admin not created: username {:?} or email {:?} is already taken \
             by another account",
            seed.username,
            seed.email
        );
        return Ok(SeedOutcome::Conflict);
    }

    let hash = password::hash(&seed.password, bcrypt_cost)?;
    let user = insert(
        &conn,
        NewUser {
            username: &seed.username,
            email: &seed.email,
            password_hash: &hash,
            role: Role::Admin,
        },
    )?;
    tracing::info!("Created bootstrap admin {} ({})", user.username, user.id);
    Ok(SeedOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn add(conn: &Connection, name: &str, role: Role) -> User {
        insert(
            conn,
            NewUser {
                username: name,
                email: &format!("{name}@example.com"),
                password_hash: "hash",
                role,
            },
        )
        .unwrap()
    }

    #[test]
    fn insert_and_find() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = add(&conn, "alice", Role::User);

        let by_id = find_by_id(&conn, &alice.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.role, Role::User);

        let by_email = find_by_email(&conn, "alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, alice.id);

        assert!(find_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_is_detected() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        add(&conn, "alice", Role::User);

        assert!(exists_with_email_or_username(&conn, "other@example.com", "alice").unwrap());
        assert!(exists_with_email_or_username(&conn, "alice@example.com", "bob").unwrap());
        assert!(!exists_with_email_or_username(&conn, "bob@example.com", "bob").unwrap());
    }

    #[test]
    fn unique_constraints_hold() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        add(&conn, "alice", Role::User);
        let dup = insert(
            &conn,
            NewUser {
                username: "alice",
                email: "different@example.com",
                password_hash: "hash",
                role: Role::User,
            },
        );
        assert!(dup.is_err());
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let bob = add(&conn, "bob", Role::User);
        assert!(delete(&conn, &bob.id).unwrap());
        assert!(!delete(&conn, &bob.id).unwrap());
        assert!(list_all(&conn).unwrap().is_empty());
    }

    #[test]
    fn ensure_admin_is_idempotent() {
        let pool = test_pool();
        let seed = AdminSeed {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "correct horse".into(),
        };
        assert_eq!(ensure_admin(&pool, &seed, 4).unwrap(), SeedOutcome::Created);
        assert_eq!(
            ensure_admin(&pool, &seed, 4).unwrap(),
            SeedOutcome::AlreadyPresent
        );

        let conn = pool.get().unwrap();
        let users = list_all(&conn).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
        assert!(password::verify("correct horse", &users[0].password_hash));
    }

    #[test]
    fn ensure_admin_reports_conflict_with_ordinary_user() {
        let pool = test_pool();
        add(&pool.get().unwrap(), "root", Role::User);

        let seed = AdminSeed {
            username: "root".into(),
            email: "admin@example.com".into(),
            password: "correct horse".into(),
        };
        assert_eq!(ensure_admin(&pool, &seed, 4).unwrap(), SeedOutcome::Conflict);

        let users = list_all(&pool.get().unwrap()).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::User);
    }
}
