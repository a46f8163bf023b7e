use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Author, Post};

/// How much of the author record to embed in each post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorDetail {
    /// id + username, for public listings
    Public,
    /// id + username + email + role, for admin listings
    Full,
}

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.image, p.created_at, p.updated_at,
            u.id, u.username, u.email, u.role
     FROM posts p
     JOIN users u ON u.id = p.author_id";

const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.id DESC";

fn from_row(row: &Row<'_>, detail: AuthorDetail) -> rusqlite::Result<Post> {
    let (email, role) = match detail {
        AuthorDetail::Public => (None, None),
        AuthorDetail::Full => (Some(row.get(8)?), Some(row.get(9)?)),
    };
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        author: Author {
            id: row.get(6)?,
            username: row.get(7)?,
            email,
            role,
        },
    })
}

pub struct NewPost<'a> {
    pub author_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub image: &'a str,
}

pub fn insert(conn: &Connection, new: NewPost<'_>) -> rusqlite::Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    conn.execute(
        "INSERT INTO posts (id, author_id, title, content, image, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, new.author_id, new.title, new.content, new.image, now],
    )?;
    Ok(id)
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        &format!("{POST_SELECT} WHERE p.id = ?1"),
        params![id],
        |row| from_row(row, AuthorDetail::Public),
    )
    .optional()
}

/// Owner lookup used by the authorization checks before any mutation.
pub fn author_of(conn: &Connection, id: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT author_id FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

pub fn list_all(conn: &Connection, detail: AuthorDetail) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!("{POST_SELECT} {NEWEST_FIRST}"))?;
    let posts = stmt
        .query_map([], |row| from_row(row, detail))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

pub fn list_by_author(conn: &Connection, author_id: &str) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "{POST_SELECT} WHERE p.author_id = ?1 {NEWEST_FIRST}"
    ))?;
    let posts = stmt
        .query_map(params![author_id], |row| from_row(row, AuthorDetail::Public))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

pub fn update(
    conn: &Connection,
    id: &str,
    title: &str,
    content: &str,
    image: &str,
) -> rusqlite::Result<bool> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let affected = conn.execute(
        "UPDATE posts SET title = ?2, content = ?3, image = ?4, updated_at = ?5 WHERE id = ?1",
        params![id, title, content, image, now],
    )?;
    Ok(affected > 0)
}

pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let affected = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}
