//! Database repository for artifacts, their version log and conversation messages.
//!
//! Versions are append-only: nothing here issues UPDATE or DELETE against the
//! `versions` table, and triggers installed by the migrations reject both.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Artifact, ArtifactFilter, ConversationMessage, CreateArtifactRequest, CreateMessageRequest,
    UpdateArtifactRequest, Version, Visibility,
};

/// How many times a version append is retried when another writer took the
/// same sequence number first.
pub const MAX_SEQUENCE_ATTEMPTS: u32 = 3;

const ARTIFACT_COLUMNS: &str = "id, title, prompt, category, visibility, owner_id, current_version, content, instructions, deleted, created_at, updated_at";
const VERSION_COLUMNS: &str = "id, artifact_id, version_number, content, instructions, created_at";
const MESSAGE_COLUMNS: &str = "id, artifact_id, message, response, is_system, created_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== ARTIFACT OPERATIONS ====================

    /// List live artifacts, newest first.
    pub async fn list_artifacts(&self, filter: &ArtifactFilter) -> Result<Vec<Artifact>, AppError> {
        let visibility = filter.visibility.map(|v| v.as_str());
        let query = format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts
             WHERE deleted = 0
               AND (?1 IS NULL OR visibility = ?1)
               AND (?2 IS NULL OR owner_id = ?2)
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&query)
            .bind(visibility)
            .bind(&filter.owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(artifact_from_row).collect())
    }

    /// Get a live artifact by ID. Tombstoned artifacts read as absent.
    pub async fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, AppError> {
        let query = format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE id = ? AND deleted = 0");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(artifact_from_row))
    }

    /// Create an artifact. When the request carries content it becomes
    /// version 1 in the same transaction and is returned alongside.
    pub async fn create_artifact(
        &self,
        request: &CreateArtifactRequest,
    ) -> Result<(Artifact, Option<Version>), AppError> {
        if let Some(content) = &request.content {
            require_content(content)?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let title = request
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| default_title(&request.prompt));

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO artifacts (id, title, prompt, category, visibility, owner_id, current_version, content, instructions, deleted, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, NULL, '', NULL, 0, ?, ?)",
        )
        .bind(&id)
        .bind(&title)
        .bind(&request.prompt)
        .bind(&request.category)
        .bind(request.visibility.as_str())
        .bind(&request.owner_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut first_version = None;
        if let Some(content) = &request.content {
            let version =
                insert_next_version(&mut tx, &id, content, request.instructions.as_deref())
                    .await?
                    .ok_or_else(|| AppError::artifact_not_found(&id))?;
            update_pointer(&mut tx, &version).await?;
            first_version = Some(version);
        }

        tx.commit().await?;

        tracing::info!(artifact_id = %id, "Created artifact");

        let artifact = self
            .get_artifact(&id)
            .await?
            .ok_or_else(|| AppError::artifact_not_found(&id))?;
        Ok((artifact, first_version))
    }

    /// Update artifact metadata. Content never changes here.
    pub async fn update_artifact(
        &self,
        id: &str,
        request: &UpdateArtifactRequest,
    ) -> Result<Artifact, AppError> {
        let existing = self
            .get_artifact(id)
            .await?
            .ok_or_else(|| AppError::artifact_not_found(id))?;

        let now = Utc::now();
        let title = request.title.clone().unwrap_or(existing.title);
        let prompt = request.prompt.clone().unwrap_or(existing.prompt);
        let category = request.category.clone().unwrap_or(existing.category);
        let visibility = request.visibility.unwrap_or(existing.visibility);

        let result = sqlx::query(
            "UPDATE artifacts SET title = ?, prompt = ?, category = ?, visibility = ?, updated_at = ?
             WHERE id = ? AND deleted = 0",
        )
        .bind(&title)
        .bind(&prompt)
        .bind(&category)
        .bind(visibility.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::artifact_not_found(id));
        }

        Ok(Artifact {
            title,
            prompt,
            category,
            visibility,
            updated_at: now,
            ..existing
        })
    }

    /// Tombstone an artifact. Its versions and messages are kept.
    pub async fn delete_artifact(&self, id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE artifacts SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::artifact_not_found(id));
        }

        tracing::info!(artifact_id = %id, "Tombstoned artifact");
        Ok(())
    }

    // ==================== VERSION OPERATIONS ====================

    /// Append a version without moving the artifact's current pointer.
    ///
    /// The caller must follow up with [`Repository::set_current_version`];
    /// [`Repository::commit_version`] does both atomically and is what the
    /// service itself uses.
    pub async fn append_version(
        &self,
        artifact_id: &str,
        content: &str,
        instructions: Option<&str>,
    ) -> Result<Version, AppError> {
        require_content(content)?;

        let pool = &self.pool;
        with_sequence_retry(artifact_id, move || {
            append_once(pool, artifact_id, content, instructions)
        })
        .await
    }

    /// Point the artifact at an existing version and cache its content.
    pub async fn set_current_version(
        &self,
        artifact_id: &str,
        version_number: i64,
        content: &str,
        instructions: Option<&str>,
    ) -> Result<Artifact, AppError> {
        let result = sqlx::query(
            "UPDATE artifacts SET current_version = ?, content = ?, instructions = ?, updated_at = ?
             WHERE id = ? AND deleted = 0
               AND EXISTS (SELECT 1 FROM versions WHERE artifact_id = ? AND version_number = ?)",
        )
        .bind(version_number)
        .bind(content)
        .bind(instructions)
        .bind(Utc::now())
        .bind(artifact_id)
        .bind(artifact_id)
        .bind(version_number)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.get_artifact(artifact_id).await?.is_none() {
                return Err(AppError::artifact_not_found(artifact_id));
            }
            return Err(AppError::NotFound(format!(
                "Version {} of artifact {} not found",
                version_number, artifact_id
            )));
        }

        self.get_artifact(artifact_id)
            .await?
            .ok_or_else(|| AppError::artifact_not_found(artifact_id))
    }

    /// Append a version and make it current in one transaction.
    pub async fn commit_version(
        &self,
        artifact_id: &str,
        content: &str,
        instructions: Option<&str>,
    ) -> Result<Version, AppError> {
        require_content(content)?;

        let pool = &self.pool;
        let version = with_sequence_retry(artifact_id, move || {
            commit_once(pool, artifact_id, content, instructions)
        })
        .await?;

        tracing::debug!(
            artifact_id,
            version_number = version.version_number,
            "Committed version"
        );
        Ok(version)
    }

    /// All stored versions of a live artifact, newest first, as stored.
    ///
    /// Use [`crate::history::list_versions`] for the deduplicated view.
    pub async fn list_versions(&self, artifact_id: &str) -> Result<Vec<Version>, AppError> {
        if self.get_artifact(artifact_id).await?.is_none() {
            return Err(AppError::artifact_not_found(artifact_id));
        }

        let query = format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE artifact_id = ?
             ORDER BY version_number DESC, created_at ASC"
        );
        let rows = sqlx::query(&query)
            .bind(artifact_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(version_from_row).collect())
    }

    /// Get one version by its number.
    pub async fn get_version(
        &self,
        artifact_id: &str,
        version_number: i64,
    ) -> Result<Option<Version>, AppError> {
        let query = format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE artifact_id = ? AND version_number = ?
             ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(artifact_id)
            .bind(version_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(version_from_row))
    }

    /// Repair artifacts whose pointer lags behind their newest version.
    ///
    /// Returns how many artifacts were moved.
    pub async fn reconcile_pointers(&self) -> Result<usize, AppError> {
        let rows = sqlx::query(
            "SELECT v.artifact_id, v.version_number, v.content, v.instructions
             FROM artifacts a
             JOIN versions v ON v.artifact_id = a.id
             WHERE a.deleted = 0
               AND v.version_number = (SELECT MAX(version_number) FROM versions WHERE artifact_id = a.id)
               AND (a.current_version IS NULL OR a.current_version <> v.version_number)",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut repaired = 0;
        for row in &rows {
            let artifact_id: String = row.get("artifact_id");
            let version_number: i64 = row.get("version_number");
            let content: String = row.get("content");
            let instructions: Option<String> = row.get("instructions");

            self.set_current_version(&artifact_id, version_number, &content, instructions.as_deref())
                .await?;
            tracing::info!(artifact_id = %artifact_id, version_number, "Reconciled current version");
            repaired += 1;
        }

        Ok(repaired)
    }

    // ==================== MESSAGE OPERATIONS ====================

    /// Record a conversation message on a live artifact.
    pub async fn add_message(
        &self,
        artifact_id: &str,
        request: &CreateMessageRequest,
    ) -> Result<ConversationMessage, AppError> {
        if self.get_artifact(artifact_id).await?.is_none() {
            return Err(AppError::artifact_not_found(artifact_id));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO messages (id, artifact_id, message, response, is_system, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(artifact_id)
        .bind(&request.message)
        .bind(&request.response)
        .bind(request.is_system as i32)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ConversationMessage {
            id,
            artifact_id: artifact_id.to_string(),
            message: request.message.clone(),
            response: request.response.clone(),
            is_system: request.is_system,
            created_at: now,
        })
    }

    /// Conversation of a live artifact, oldest first.
    pub async fn list_messages(
        &self,
        artifact_id: &str,
    ) -> Result<Vec<ConversationMessage>, AppError> {
        if self.get_artifact(artifact_id).await?.is_none() {
            return Err(AppError::artifact_not_found(artifact_id));
        }

        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE artifact_id = ? ORDER BY created_at, rowid"
        );
        let rows = sqlx::query(&query)
            .bind(artifact_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Get a message by ID.
    pub async fn get_message(&self, id: &str) -> Result<Option<ConversationMessage>, AppError> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(message_from_row))
    }
}

/// Versions are snapshots of generated content; a blank one is never stored.
fn require_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("content is required".to_string()));
    }
    Ok(())
}

/// Run one sequence-assigning write, retrying while another writer holds the
/// computed version number. `Ok(None)` from `op` means the artifact is gone.
async fn with_sequence_retry<T, F, Fut>(artifact_id: &str, mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, sqlx::Error>>,
{
    for attempt in 1..=MAX_SEQUENCE_ATTEMPTS {
        match op().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => return Err(AppError::artifact_not_found(artifact_id)),
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(artifact_id, attempt, "Version number taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(sequence_conflict(artifact_id))
}

async fn append_once(
    pool: &SqlitePool,
    artifact_id: &str,
    content: &str,
    instructions: Option<&str>,
) -> Result<Option<Version>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    insert_next_version(&mut conn, artifact_id, content, instructions).await
}

async fn commit_once(
    pool: &SqlitePool,
    artifact_id: &str,
    content: &str,
    instructions: Option<&str>,
) -> Result<Option<Version>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let Some(version) = insert_next_version(&mut tx, artifact_id, content, instructions).await?
    else {
        return Ok(None);
    };
    update_pointer(&mut tx, &version).await?;
    tx.commit().await?;
    Ok(Some(version))
}

/// Insert the artifact's next version. The number is assigned inside the
/// statement, so no read-then-write window exists. `None` when the artifact
/// is missing or tombstoned.
async fn insert_next_version(
    conn: &mut SqliteConnection,
    artifact_id: &str,
    content: &str,
    instructions: Option<&str>,
) -> Result<Option<Version>, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    let row = sqlx::query(
        "INSERT INTO versions (id, artifact_id, version_number, content, instructions, created_at)
         SELECT ?, a.id,
                COALESCE((SELECT MAX(v.version_number) FROM versions v WHERE v.artifact_id = a.id), 0) + 1,
                ?, ?, ?
         FROM artifacts a
         WHERE a.id = ? AND a.deleted = 0
         RETURNING version_number",
    )
    .bind(&id)
    .bind(content)
    .bind(instructions)
    .bind(now)
    .bind(artifact_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| Version {
        id,
        artifact_id: artifact_id.to_string(),
        version_number: row.get("version_number"),
        content: content.to_string(),
        instructions: instructions.map(str::to_string),
        created_at: now,
    }))
}

async fn update_pointer(conn: &mut SqliteConnection, version: &Version) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE artifacts SET current_version = ?, content = ?, instructions = ?, updated_at = ? WHERE id = ?",
    )
    .bind(version.version_number)
    .bind(&version.content)
    .bind(&version.instructions)
    .bind(version.created_at)
    .bind(&version.artifact_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn sequence_conflict(artifact_id: &str) -> AppError {
    AppError::Conflict(format!(
        "Could not assign a version number for artifact {} after {} attempts",
        artifact_id, MAX_SEQUENCE_ATTEMPTS
    ))
}

/// First line of the prompt, capped, for artifacts created without a title.
fn default_title(prompt: &str) -> String {
    let first_line = prompt.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "Untitled".to_string();
    }
    first_line.chars().take(80).collect()
}

// Helper functions for row conversion

fn artifact_from_row(row: &SqliteRow) -> Artifact {
    let visibility: String = row.get("visibility");
    let deleted: i32 = row.get("deleted");
    Artifact {
        id: row.get("id"),
        title: row.get("title"),
        prompt: row.get("prompt"),
        category: row.get("category"),
        visibility: Visibility::parse(&visibility).unwrap_or_default(),
        owner_id: row.get("owner_id"),
        current_version: row.get("current_version"),
        content: row.get("content"),
        instructions: row.get("instructions"),
        deleted: deleted != 0,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn version_from_row(row: &SqliteRow) -> Version {
    Version {
        id: row.get("id"),
        artifact_id: row.get("artifact_id"),
        version_number: row.get("version_number"),
        content: row.get("content"),
        instructions: row.get("instructions"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn message_from_row(row: &SqliteRow) -> ConversationMessage {
    let is_system: i32 = row.get("is_system");
    ConversationMessage {
        id: row.get("id"),
        artifact_id: row.get("artifact_id"),
        message: row.get("message"),
        response: row.get("response"),
        is_system: is_system != 0,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tempfile::TempDir;

    use super::*;

    async fn temp_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = crate::db::init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        sqlx::query("CREATE TABLE taken (n INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO taken (n) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();
        (pool, temp_dir)
    }

    /// Fails with a real unique violation on the first `collisions` calls.
    async fn collide_until(
        pool: &SqlitePool,
        call: u32,
        collisions: u32,
    ) -> Result<Option<u32>, sqlx::Error> {
        if call <= collisions {
            sqlx::query("INSERT INTO taken (n) VALUES (1)")
                .execute(pool)
                .await?;
        }
        Ok(Some(call))
    }

    #[tokio::test]
    async fn test_sequence_retry_recovers_after_collisions() {
        let (pool, _dir) = temp_pool().await;
        let calls = Cell::new(0);

        let result = with_sequence_retry("a1", || {
            calls.set(calls.get() + 1);
            collide_until(&pool, calls.get(), MAX_SEQUENCE_ATTEMPTS - 1)
        })
        .await
        .unwrap();

        assert_eq!(result, MAX_SEQUENCE_ATTEMPTS);
        assert_eq!(calls.get(), MAX_SEQUENCE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_sequence_retry_gives_up_with_conflict() {
        let (pool, _dir) = temp_pool().await;
        let calls = Cell::new(0);

        let err = with_sequence_retry("a1", || {
            calls.set(calls.get() + 1);
            collide_until(&pool, calls.get(), u32::MAX)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(calls.get(), MAX_SEQUENCE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_sequence_retry_does_not_retry_other_errors() {
        let (pool, _dir) = temp_pool().await;
        let calls = Cell::new(0);

        let err = with_sequence_retry("a1", || {
            calls.set(calls.get() + 1);
            let pool = &pool;
            async move {
                sqlx::query("INSERT INTO missing_table (n) VALUES (1)")
                    .execute(pool)
                    .await?;
                Ok::<_, sqlx::Error>(Some(()))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_default_title_uses_first_prompt_line() {
        assert_eq!(default_title("A snake game\nwith neon colors"), "A snake game");
        assert_eq!(default_title("   "), "Untitled");
        assert_eq!(default_title(&"x".repeat(200)).len(), 80);
    }
}
