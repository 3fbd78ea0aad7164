// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Relationship store operations.
//!
//! Per-user record plus the redundant pending-request sets and the ordered
//! friend list. The set primitives are single statements; multi-step
//! sequences over them are serialized by the coordinator's pair locks.

use rusqlite::params;

use super::{Storage, StorageError};
use crate::protocol::{OnlineStatus, UserSummary};

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub full_name: String,
    pub avatar: String,
    pub status_online: OnlineStatus,
}

/// One confirmed friendship entry: the friend and the shared room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendEntry {
    pub friend_id: String,
    pub room_id: String,
}

impl Storage {
    // === User records ===

    /// Saves a user record with its session token.
    pub fn save_user(&self, user: &UserRecord, token: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO users (id, full_name, avatar, token, status_online)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.full_name,
                user.avatar,
                token,
                user.status_online.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Resolves a session token to its user, if any.
    pub fn user_by_token(&self, token: &str) -> Result<Option<UserRecord>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, full_name, avatar, status_online FROM users WHERE token = ?1",
        )?;
        let result = stmt.query_row(params![token], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                full_name: row.get(1)?,
                avatar: row.get(2)?,
                status_online: OnlineStatus::from_str_or_offline(&row.get::<_, String>(3)?),
            })
        });
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Loads the public profile summary for a user.
    pub fn profile(&self, id: &str) -> Result<Option<UserSummary>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, avatar, full_name FROM users WHERE id = ?1")?;
        let result = stmt.query_row(params![id], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                avatar: row.get(1)?,
                full_name: row.get(2)?,
            })
        });
        match result {
            Ok(summary) => Ok(Some(summary)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn user_exists(&self, id: &str) -> Result<bool, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT 1 FROM users WHERE id = ?1")?;
        Ok(stmt.exists(params![id])?)
    }

    pub fn user_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Best-effort presence flag.
    pub fn set_status(&self, id: &str, status: OnlineStatus) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE users SET status_online = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(())
    }

    // === Pending request sets ===

    /// `other` is in `user`'s sent-request set.
    pub fn request_exists(&self, user: &str, other: &str) -> Result<bool, StorageError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT 1 FROM request_friends WHERE user_id = ?1 AND other_id = ?2")?;
        Ok(stmt.exists(params![user, other])?)
    }

    /// `other` is in `user`'s received-request set.
    pub fn accept_exists(&self, user: &str, other: &str) -> Result<bool, StorageError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT 1 FROM accept_friends WHERE user_id = ?1 AND other_id = ?2")?;
        Ok(stmt.exists(params![user, other])?)
    }

    /// Adds `other` to `user`'s sent-request set (no-op if present).
    pub fn push_request(&self, user: &str, other: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR IGNORE INTO request_friends (user_id, other_id) VALUES (?1, ?2)",
            params![user, other],
        )?;
        Ok(())
    }

    /// Removes `other` from `user`'s sent-request set (no-op if absent).
    pub fn pull_request(&self, user: &str, other: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "DELETE FROM request_friends WHERE user_id = ?1 AND other_id = ?2",
            params![user, other],
        )?;
        Ok(())
    }

    /// Adds `other` to `user`'s received-request set (no-op if present).
    pub fn push_accept(&self, user: &str, other: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR IGNORE INTO accept_friends (user_id, other_id) VALUES (?1, ?2)",
            params![user, other],
        )?;
        Ok(())
    }

    /// Removes `other` from `user`'s received-request set (no-op if absent).
    pub fn pull_accept(&self, user: &str, other: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "DELETE FROM accept_friends WHERE user_id = ?1 AND other_id = ?2",
            params![user, other],
        )?;
        Ok(())
    }

    /// `user`'s sent-request set.
    pub fn request_friends(&self, user: &str) -> Result<Vec<String>, StorageError> {
        self.set_members("request_friends", user)
    }

    /// `user`'s received-request set.
    pub fn accept_friends(&self, user: &str) -> Result<Vec<String>, StorageError> {
        self.set_members("accept_friends", user)
    }

    /// Badge count: number of pending requests received by `user`.
    pub fn accept_count(&self, user: &str) -> Result<usize, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM accept_friends WHERE user_id = ?1",
            params![user],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn set_members(&self, table: &str, user: &str) -> Result<Vec<String>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT other_id FROM {} WHERE user_id = ?1 ORDER BY other_id",
            table
        ))?;
        let rows = stmt.query_map(params![user], |row| row.get(0))?;
        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    // === Friend list ===

    /// `user`'s confirmed friendships, in insertion order.
    pub fn friends_of(&self, user: &str) -> Result<Vec<FriendEntry>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT friend_id, room_id FROM friend_list WHERE user_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![user], |row| {
            Ok(FriendEntry {
                friend_id: row.get(0)?,
                room_id: row.get(1)?,
            })
        })?;
        let mut friends = Vec::new();
        for row in rows {
            friends.push(row?);
        }
        Ok(friends)
    }

    /// The friendship entry between `user` and `friend`, if confirmed.
    pub fn friend_entry(&self, user: &str, friend: &str) -> Result<Option<FriendEntry>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT friend_id, room_id FROM friend_list WHERE user_id = ?1 AND friend_id = ?2",
        )?;
        let result = stmt.query_row(params![user, friend], |row| {
            Ok(FriendEntry {
                friend_id: row.get(0)?,
                room_id: row.get(1)?,
            })
        });
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }
}
