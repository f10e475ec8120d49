use anyhow::{Context, Result};
use chrono::Utc;

use super::UserRegistry;
use crate::platform::{ChatKind, SenderMeta};

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub chat_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub chat_type: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRegistry {
    /// Insert the chat, or refresh its profile fields if it is already known.
    /// Concurrent writers simply overwrite each other.
    pub async fn upsert(&self, chat_id: i64, sender: &SenderMeta, kind: ChatKind) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (chat_id, first_name, username, chat_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(chat_id) DO UPDATE SET
                first_name = excluded.first_name,
                username = excluded.username,
                chat_type = excluded.chat_type,
                updated_at = excluded.updated_at",
            rusqlite::params![
                chat_id,
                sender.first_name,
                sender.username,
                kind.as_str(),
                now,
            ],
        )
        .with_context(|| format!("Failed to upsert user {}", chat_id))?;
        Ok(())
    }

    /// Number of known chats
    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("Failed to count users")?;
        Ok(count as u64)
    }

    #[cfg(test)]
    pub async fn get(&self, chat_id: i64) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT chat_id, first_name, username, chat_type, created_at, updated_at
                 FROM users WHERE chat_id = ?1",
            )
            .context("Failed to prepare user query")?;
        let mut rows = stmt
            .query_map(rusqlite::params![chat_id], |row| {
                Ok(UserRecord {
                    chat_id: row.get(0)?,
                    first_name: row.get(1)?,
                    username: row.get(2)?,
                    chat_type: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })
            .context("Failed to query user")?;
        match rows.next() {
            Some(Ok(user)) => Ok(Some(user)),
            Some(Err(e)) => Err(e).context("Failed to deserialize user"),
            None => Ok(None),
        }
    }
}
