/// Turn persistence operations
///
/// SQLite implementation of the `TurnStore` trait. All queries are
/// parameterized; the memory map round-trips through a JSON text column.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

use sdk::{Role, Turn};

use super::TurnStore;

/// Turn repository for database operations
pub struct TurnRepository {
    pool: SqlitePool,
}

impl TurnRepository {
    /// Create a new turn repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TurnStore for TurnRepository {
    async fn append(&self, conversation_id: &str, turn: &Turn) -> Result<()> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
        let memory =
            serde_json::to_string(&turn.memory).context("Failed to serialize turn memory")?;

        sqlx::query(
            "INSERT INTO turns (conversation_id, role, content, memory, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(memory)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to append turn")?;

        Ok(())
    }

    async fn fetch_all(&self, conversation_id: &str) -> Result<Vec<Turn>> {
        let rows = sqlx::query(
            "SELECT role, content, memory FROM turns \
             WHERE conversation_id = ? ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch turns")?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in rows {
            let role_str: String = row.get("role");
            let role = Role::parse(&role_str)
                .ok_or_else(|| anyhow!("Unknown stored role '{}'", role_str))?;

            let memory_str: String = row.get("memory");
            let memory = serde_json::from_str(&memory_str)
                .context("Failed to parse stored turn memory")?;

            turns.push(Turn {
                role,
                content: row.get("content"),
                memory,
            });
        }

        Ok(turns)
    }
}
