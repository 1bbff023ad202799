/// Note model and database operations
///
/// Notes are sharded on `owner_user_id` and co-located with `shared.users`.
/// Every query here filters on the owner, so each one is routed to a single
/// shard.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notes (
///     id SERIAL,
///     content TEXT NOT NULL,
///     owner_user_id INTEGER NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (id, owner_user_id)
/// );
/// SELECT create_distributed_table('notes', 'owner_user_id', colocate_with => 'shared.users');
/// ```
///
/// There is no foreign key to `shared.users`; the owner is checked by callers
/// that obtained it from an authenticated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use super::partition::{Distribution, Partitioned};
use super::user::User;

/// Error type for note writes
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// Content was empty or only whitespace
    #[error("Note content must not be empty")]
    EmptyContent,

    /// Backend failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Note model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    /// Note ID
    pub id: i32,

    /// Note body
    pub content: String,

    /// Owning user, also the shard key
    pub owner_user_id: i32,

    /// When the note was created
    pub created_at: DateTime<Utc>,

    /// When the content last changed
    pub updated_at: DateTime<Utc>,
}

impl Partitioned for Note {
    const TABLE: &'static str = "notes";
    const DISTRIBUTION: Distribution = Distribution::ShardedOn {
        shard_key: "owner_user_id",
        colocate_with: Some(User::TABLE),
    };
}

/// Trims content and rejects it if nothing is left
fn normalize_content(content: &str) -> Result<&str, NoteError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(NoteError::EmptyContent)
    } else {
        Ok(trimmed)
    }
}

impl Note {
    /// Creates a note for an owner
    ///
    /// Both timestamps are set to the current time.
    ///
    /// # Errors
    ///
    /// Returns `NoteError::EmptyContent` for blank content, without touching
    /// the database.
    pub async fn create(pool: &PgPool, owner_user_id: i32, content: &str) -> Result<Self, NoteError> {
        let content = normalize_content(content)?;

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (content, owner_user_id, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            RETURNING id, content, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(content)
        .bind(owner_user_id)
        .fetch_one(pool)
        .await?;

        debug!(note_id = note.id, owner_user_id, "Created note");
        Ok(note)
    }

    /// Lists an owner's notes, newest first
    ///
    /// Ties on `created_at` are broken by id so a note created later always
    /// sorts ahead of earlier ones.
    pub async fn list_for_user(pool: &PgPool, owner_user_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, content, owner_user_id, created_at, updated_at
            FROM notes
            WHERE owner_user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(pool)
        .await?;

        Ok(notes)
    }

    /// Finds one of an owner's notes
    pub async fn find(pool: &PgPool, owner_user_id: i32, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, content, owner_user_id, created_at, updated_at
            FROM notes
            WHERE owner_user_id = $1 AND id = $2
            "#,
        )
        .bind(owner_user_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Replaces a note's content and refreshes `updated_at`
    ///
    /// Returns `None` if the owner has no note with this id.
    pub async fn update_content(
        pool: &PgPool,
        owner_user_id: i32,
        id: i32,
        content: &str,
    ) -> Result<Option<Self>, NoteError> {
        let content = normalize_content(content)?;

        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET content = $3, updated_at = NOW()
            WHERE owner_user_id = $1 AND id = $2
            RETURNING id, content, owner_user_id, created_at, updated_at
            "#,
        )
        .bind(owner_user_id)
        .bind(id)
        .bind(content)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_content_trims() {
        assert_eq!(normalize_content("  hello \n").unwrap(), "hello");
    }

    #[test]
    fn test_normalize_content_rejects_blank() {
        assert!(matches!(normalize_content(""), Err(NoteError::EmptyContent)));
        assert!(matches!(normalize_content(" \t\n"), Err(NoteError::EmptyContent)));
    }

    // Integration tests for database operations are in tests/tenancy_tests.rs
}
