// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message persistence.
//!
//! A message is stored before any broadcast is emitted. Image URLs are
//! opaque strings produced by the upload subsystem and kept as a JSON
//! column.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::params;
use uuid::Uuid;

use super::{Storage, StorageError};

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub content: String,
    pub images: Vec<String>,
    pub created_at_secs: u64,
}

impl Storage {
    /// Persists a message and returns the stored record.
    pub fn save_message(
        &self,
        room_id: &str,
        sender_id: &str,
        content: &str,
        images: &[String],
    ) -> Result<StoredMessage, StorageError> {
        let images_json = serde_json::to_string(images)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let created_at_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            images: images.to_vec(),
            created_at_secs,
        };
        self.conn().execute(
            "INSERT INTO messages (id, room_id, sender_id, content, images_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.room_id,
                message.sender_id,
                message.content,
                images_json,
                created_at_secs as i64,
            ],
        )?;
        Ok(message)
    }

    /// The most recent messages of a room, oldest first.
    pub fn recent_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, room_id, sender_id, content, images_json, created_at
             FROM messages WHERE room_id = ?1 ORDER BY rowid DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![room_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, room_id, sender_id, content, images_json, created_at) = row?;
            let images = serde_json::from_str(&images_json)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            messages.push(StoredMessage {
                id,
                room_id,
                sender_id,
                content,
                images,
                created_at_secs: created_at as u64,
            });
        }
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_read_back() {
        let storage = Storage::in_memory().unwrap();
        let images = vec!["/uploads/1.png".to_string()];
        let stored = storage.save_message("r-1", "a", "hello", &images).unwrap();

        let messages = storage.recent_messages("r-1", 10).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], stored);
        assert_eq!(messages[0].images, images);
    }

    #[test]
    fn test_recent_messages_ordered_and_limited() {
        let storage = Storage::in_memory().unwrap();
        for i in 0..5 {
            storage
                .save_message("r-1", "a", &format!("msg {}", i), &[])
                .unwrap();
        }
        storage.save_message("r-2", "b", "other room", &[]).unwrap();

        let messages = storage.recent_messages("r-1", 3).unwrap();
        assert_eq!(messages.len(), 3);
        // oldest first within the window
        assert_eq!(messages[0].content, "msg 2");
        assert_eq!(messages[2].content, "msg 4");
    }
}
