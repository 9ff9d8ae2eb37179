//! Thread persistence: conversation threads and their messages.
//!
//! DESIGN
//! ======
//! [`ThreadStore`] is the seam between the chat turn and storage. Postgres
//! backs it in production ([`PgThreadStore`]); [`MemoryThreadStore`] serves
//! tests and single-process runs without `DATABASE_URL`.
//!
//! Messages are stored whole: role plus the full parts list as JSON, so a
//! reload sees exactly the tool states and outputs that were streamed.
//!
//! ERROR HANDLING
//! ==============
//! A thread owned by another user is reported as `NotFound`, never as
//! forbidden, so ids cannot be probed. An assistant message with no parts is
//! refused at the store boundary.

#[cfg(test)]
#[path = "thread_test.rs"]
mod tests;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;
use wire::{Message, Part, Role};

/// Longest title derived from a first message, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

/// Title used when the first message has no usable text.
pub const UNTITLED: &str = "New chat";

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Title from the first user message: first line, trimmed, at most
/// [`MAX_TITLE_CHARS`] characters.
#[must_use]
pub fn derive_title(text: &str) -> String {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    if line.is_empty() {
        return UNTITLED.to_owned();
    }
    if line.chars().count() <= MAX_TITLE_CHARS {
        return line.to_owned();
    }
    let cut: String = line.chars().take(MAX_TITLE_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error("thread not found: {0}")]
    NotFound(Uuid),
    #[error("assistant message {0} has no parts")]
    EmptyParts(Uuid),
    #[error("stored message {id} is unreadable: {reason}")]
    Corrupt { id: Uuid, reason: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for ThreadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_THREAD_NOT_FOUND",
            Self::EmptyParts(_) => "E_EMPTY_PARTS",
            Self::Corrupt { .. } => "E_THREAD_CORRUPT",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

fn check_parts(message: &Message) -> Result<(), ThreadError> {
    if message.role == Role::Assistant && message.parts.is_empty() {
        return Err(ThreadError::EmptyParts(message.id));
    }
    Ok(())
}

// =============================================================================
// STORE TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait ThreadStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ThreadError::Database`] on storage failure.
    async fn create_thread(&self, user_id: &str, title: &str) -> Result<Thread, ThreadError>;

    /// # Errors
    ///
    /// Returns [`ThreadError::NotFound`] if the thread is absent or owned by someone else.
    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Thread, ThreadError>;

    /// The user's threads, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::Database`] on storage failure.
    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>, ThreadError>;

    /// # Errors
    ///
    /// Returns [`ThreadError::NotFound`] if the thread is absent or owned by someone else.
    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<(), ThreadError>;

    /// Messages in append order.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::NotFound`] for an unknown thread.
    async fn load_messages(&self, thread_id: Uuid) -> Result<Vec<Message>, ThreadError>;

    /// Append one message and bump the thread's `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadError::EmptyParts`] for an assistant message without
    /// parts and [`ThreadError::NotFound`] for an unknown thread.
    async fn append_message(&self, thread_id: Uuid, message: &Message) -> Result<(), ThreadError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgThreadStore {
    pool: PgPool,
}

impl PgThreadStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ThreadRow = (Uuid, String, String, i64, i64);

fn thread_from_row((id, user_id, title, created_at, updated_at): ThreadRow) -> Thread {
    Thread { id, user_id, title, created_at, updated_at }
}

#[async_trait::async_trait]
impl ThreadStore for PgThreadStore {
    async fn create_thread(&self, user_id: &str, title: &str) -> Result<Thread, ThreadError> {
        let now = now_ms();
        let thread = Thread { id: Uuid::new_v4(), user_id: user_id.to_owned(), title: title.to_owned(), created_at: now, updated_at: now };
        sqlx::query("INSERT INTO threads (id, user_id, title, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(thread.id)
            .bind(&thread.user_id)
            .bind(&thread.title)
            .bind(thread.created_at)
            .bind(thread.updated_at)
            .execute(&self.pool)
            .await?;
        tracing::info!(thread_id = %thread.id, %user_id, "thread: created");
        Ok(thread)
    }

    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Thread, ThreadError> {
        let row = sqlx::query_as::<_, ThreadRow>(
            "SELECT id, user_id, title, created_at, updated_at FROM threads WHERE id = $1 AND user_id = $2",
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(thread_from_row)
            .ok_or(ThreadError::NotFound(thread_id))
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>, ThreadError> {
        let rows = sqlx::query_as::<_, ThreadRow>(
            "SELECT id, user_id, title, created_at, updated_at FROM threads
             WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(thread_from_row).collect())
    }

    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<(), ThreadError> {
        let result = sqlx::query("DELETE FROM threads WHERE id = $1 AND user_id = $2")
            .bind(thread_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ThreadError::NotFound(thread_id));
        }
        tracing::info!(%thread_id, %user_id, "thread: deleted");
        Ok(())
    }

    async fn load_messages(&self, thread_id: Uuid) -> Result<Vec<Message>, ThreadError> {
        let rows = sqlx::query_as::<_, (Uuid, String, serde_json::Value, i64)>(
            "SELECT id, role, parts, created_at FROM messages WHERE thread_id = $1 ORDER BY seq ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, role, parts, created_at)| {
                let role = Role::parse(&role).ok_or_else(|| ThreadError::Corrupt { id, reason: format!("role {role:?}") })?;
                let parts: Vec<Part> =
                    serde_json::from_value(parts).map_err(|e| ThreadError::Corrupt { id, reason: e.to_string() })?;
                Ok(Message { id, role, parts, created_at })
            })
            .collect()
    }

    async fn append_message(&self, thread_id: Uuid, message: &Message) -> Result<(), ThreadError> {
        check_parts(message)?;
        let parts =
            serde_json::to_value(&message.parts).map_err(|e| ThreadError::Corrupt { id: message.id, reason: e.to_string() })?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE threads SET updated_at = $2 WHERE id = $1")
            .bind(thread_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ThreadError::NotFound(thread_id));
        }
        sqlx::query("INSERT INTO messages (id, thread_id, role, parts, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(message.id)
            .bind(thread_id)
            .bind(message.role.as_str())
            .bind(parts)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

struct MemoryThread {
    thread: Thread,
    messages: Vec<Message>,
}

/// Process-local store. Contents vanish on restart.
#[derive(Default)]
pub struct MemoryThreadStore {
    threads: RwLock<HashMap<Uuid, MemoryThread>>,
}

impl MemoryThreadStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn create_thread(&self, user_id: &str, title: &str) -> Result<Thread, ThreadError> {
        let now = now_ms();
        let thread = Thread { id: Uuid::new_v4(), user_id: user_id.to_owned(), title: title.to_owned(), created_at: now, updated_at: now };
        let mut threads = self.threads.write().await;
        threads.insert(thread.id, MemoryThread { thread: thread.clone(), messages: Vec::new() });
        Ok(thread)
    }

    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Thread, ThreadError> {
        let threads = self.threads.read().await;
        threads
            .get(&thread_id)
            .map(|t| &t.thread)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or(ThreadError::NotFound(thread_id))
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>, ThreadError> {
        let threads = self.threads.read().await;
        let mut owned: Vec<Thread> = threads
            .values()
            .map(|t| &t.thread)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.created_at.cmp(&a.created_at)));
        Ok(owned)
    }

    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<(), ThreadError> {
        let mut threads = self.threads.write().await;
        let owned = threads
            .get(&thread_id)
            .is_some_and(|t| t.thread.user_id == user_id);
        if !owned {
            return Err(ThreadError::NotFound(thread_id));
        }
        threads.remove(&thread_id);
        Ok(())
    }

    async fn load_messages(&self, thread_id: Uuid) -> Result<Vec<Message>, ThreadError> {
        let threads = self.threads.read().await;
        threads
            .get(&thread_id)
            .map(|t| t.messages.clone())
            .ok_or(ThreadError::NotFound(thread_id))
    }

    async fn append_message(&self, thread_id: Uuid, message: &Message) -> Result<(), ThreadError> {
        check_parts(message)?;
        let mut threads = self.threads.write().await;
        let entry = threads
            .get_mut(&thread_id)
            .ok_or(ThreadError::NotFound(thread_id))?;
        entry.thread.updated_at = entry.thread.updated_at.max(message.created_at);
        entry.messages.push(message.clone());
        Ok(())
    }
}
