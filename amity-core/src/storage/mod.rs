// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! SQLite-backed stores for users (the relationship store), rooms, and
//! messages. The coordinator is the sole writer of relationship and room
//! state; the gateway only reads (session lookup, readiness checks).

mod error;
mod messages;
mod rooms;
mod users;

pub use error::StorageError;
pub use messages::StoredMessage;
pub use rooms::{Room, RoomParticipant, ROLE_SUPER_ADMIN, ROOM_TYPE_FRIEND};
pub use users::{FriendEntry, UserRecord};

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    avatar TEXT NOT NULL DEFAULT '',
    token TEXT NOT NULL UNIQUE,
    status_online TEXT NOT NULL DEFAULT 'offline'
);

-- Pending requests are stored redundantly on both sides, mirroring the
-- per-user request/accept sets: a row in request_friends means other_id is
-- in user_id's sent set, a row in accept_friends means other_id is in
-- user_id's received set. The coordinator keeps the two in lockstep.
CREATE TABLE IF NOT EXISTS request_friends (
    user_id TEXT NOT NULL,
    other_id TEXT NOT NULL,
    PRIMARY KEY (user_id, other_id)
);

CREATE TABLE IF NOT EXISTS accept_friends (
    user_id TEXT NOT NULL,
    other_id TEXT NOT NULL,
    PRIMARY KEY (user_id, other_id)
);

CREATE TABLE IF NOT EXISTS friend_list (
    user_id TEXT NOT NULL,
    friend_id TEXT NOT NULL,
    room_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, friend_id)
);

CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY,
    type_room TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS room_participants (
    room_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    role TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (room_id, user_id)
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    room_id TEXT NOT NULL,
    sender_id TEXT NOT NULL,
    content TEXT NOT NULL,
    images_json TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_room ON messages (room_id);
";

/// SQLite-based storage shared across connection handlers.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Storage {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OnlineStatus;
    use crate::storage::UserRecord;

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amity.db");
        {
            let storage = Storage::open(&path).unwrap();
            storage
                .save_user(
                    &UserRecord {
                        id: "a".to_string(),
                        full_name: "Alice".to_string(),
                        avatar: String::new(),
                        status_online: OnlineStatus::Offline,
                    },
                    "tok-a",
                )
                .unwrap();
            storage.push_request("a", "b").unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert!(storage.user_by_token("tok-a").unwrap().is_some());
        assert_eq!(storage.request_friends("a").unwrap(), vec!["b"]);
    }
}
