// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Room store operations.
//!
//! Rooms are created exactly once per confirmed friend pair and never
//! deleted, except to discard a reserved room when the accept saga fails
//! before its friendship commit.

use rusqlite::params;
use uuid::Uuid;

use super::{Storage, StorageError};

/// Room type for two-party friend rooms.
pub const ROOM_TYPE_FRIEND: &str = "friend";

/// Role assigned to both participants of a friend room.
pub const ROLE_SUPER_ADMIN: &str = "superAdmin";

/// A communication room with its ordered participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub type_room: String,
    pub participants: Vec<RoomParticipant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomParticipant {
    pub user_id: String,
    pub role: String,
}

impl RoomParticipant {
    pub fn super_admin(user_id: impl Into<String>) -> Self {
        RoomParticipant {
            user_id: user_id.into(),
            role: ROLE_SUPER_ADMIN.to_string(),
        }
    }
}

impl Storage {
    /// Creates a room with the given participants and returns its id.
    pub fn create_room(
        &self,
        type_room: &str,
        participants: &[RoomParticipant],
    ) -> Result<String, StorageError> {
        let id = Uuid::new_v4().to_string();
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO rooms (id, type_room) VALUES (?1, ?2)",
            params![id, type_room],
        )?;
        for (position, participant) in participants.iter().enumerate() {
            tx.execute(
                "INSERT INTO room_participants (room_id, user_id, role, position)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, participant.user_id, participant.role, position as i64],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Discards a room. Only used when the accept saga fails after reserving
    /// the room and before committing the friendship.
    pub fn delete_room(&self, id: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM room_participants WHERE room_id = ?1",
            params![id],
        )?;
        let rows = tx.execute("DELETE FROM rooms WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    /// Loads a room with its participants.
    pub fn room(&self, id: &str) -> Result<Option<Room>, StorageError> {
        let type_room: Option<String> = {
            let conn = self.conn();
            let result = conn.query_row(
                "SELECT type_room FROM rooms WHERE id = ?1",
                params![id],
                |row| row.get(0),
            );
            match result {
                Ok(t) => Some(t),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(StorageError::Database(e)),
            }
        };
        let Some(type_room) = type_room else {
            return Ok(None);
        };
        Ok(Some(Room {
            id: id.to_string(),
            type_room,
            participants: self.room_participants(id)?,
        }))
    }

    /// Participants of a room, in insertion order. Empty if the room does
    /// not exist.
    pub fn room_participants(&self, id: &str) -> Result<Vec<RoomParticipant>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, role FROM room_participants WHERE room_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(RoomParticipant {
                user_id: row.get(0)?,
                role: row.get(1)?,
            })
        })?;
        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    pub fn room_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM rooms", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Commits a confirmed friendship in a single transaction: pushes the
    /// friend-list entry on both sides and clears every pending-request row
    /// between the pair, in both directions.
    ///
    /// `requester` sent the original request; `accepter` confirmed it.
    pub fn record_friendship(
        &self,
        requester: &str,
        accepter: &str,
        room_id: &str,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for (user, friend) in [(accepter, requester), (requester, accepter)] {
            tx.execute(
                "INSERT INTO friend_list (user_id, friend_id, room_id, position)
                 VALUES (?1, ?2, ?3,
                         (SELECT COALESCE(MAX(position) + 1, 0) FROM friend_list WHERE user_id = ?1))",
                params![user, friend, room_id],
            )?;
            tx.execute(
                "DELETE FROM request_friends WHERE user_id = ?1 AND other_id = ?2",
                params![user, friend],
            )?;
            tx.execute(
                "DELETE FROM accept_friends WHERE user_id = ?1 AND other_id = ?2",
                params![user, friend],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_load_room() {
        let storage = Storage::in_memory().unwrap();
        let participants = [
            RoomParticipant::super_admin("a"),
            RoomParticipant::super_admin("b"),
        ];
        let id = storage.create_room(ROOM_TYPE_FRIEND, &participants).unwrap();

        let room = storage.room(&id).unwrap().unwrap();
        assert_eq!(room.type_room, ROOM_TYPE_FRIEND);
        assert_eq!(room.participants.len(), 2);
        assert_eq!(room.participants[0].user_id, "a");
        assert_eq!(room.participants[1].user_id, "b");
        assert_eq!(room.participants[0].role, ROLE_SUPER_ADMIN);
    }

    #[test]
    fn test_delete_room_discards_participants() {
        let storage = Storage::in_memory().unwrap();
        let id = storage
            .create_room(ROOM_TYPE_FRIEND, &[RoomParticipant::super_admin("a")])
            .unwrap();

        assert!(storage.delete_room(&id).unwrap());
        assert!(storage.room(&id).unwrap().is_none());
        assert!(storage.room_participants(&id).unwrap().is_empty());
        assert!(!storage.delete_room(&id).unwrap());
    }

    #[test]
    fn test_record_friendship_clears_both_directions() {
        let storage = Storage::in_memory().unwrap();
        // a -> b request, plus a stale reverse request b -> a
        storage.push_request("a", "b").unwrap();
        storage.push_accept("b", "a").unwrap();
        storage.push_request("b", "a").unwrap();
        storage.push_accept("a", "b").unwrap();

        let room_id = storage
            .create_room(
                ROOM_TYPE_FRIEND,
                &[
                    RoomParticipant::super_admin("a"),
                    RoomParticipant::super_admin("b"),
                ],
            )
            .unwrap();
        storage.record_friendship("a", "b", &room_id).unwrap();

        assert_eq!(storage.friends_of("a").unwrap()[0].friend_id, "b");
        assert_eq!(storage.friends_of("b").unwrap()[0].friend_id, "a");
        assert_eq!(storage.friends_of("a").unwrap()[0].room_id, room_id);
        assert!(storage.request_friends("a").unwrap().is_empty());
        assert!(storage.request_friends("b").unwrap().is_empty());
        assert!(storage.accept_friends("a").unwrap().is_empty());
        assert!(storage.accept_friends("b").unwrap().is_empty());
    }

    #[test]
    fn test_friend_list_positions_increment() {
        let storage = Storage::in_memory().unwrap();
        let r1 = storage
            .create_room(ROOM_TYPE_FRIEND, &[RoomParticipant::super_admin("a")])
            .unwrap();
        let r2 = storage
            .create_room(ROOM_TYPE_FRIEND, &[RoomParticipant::super_admin("a")])
            .unwrap();
        storage.record_friendship("b", "a", &r1).unwrap();
        storage.record_friendship("c", "a", &r2).unwrap();

        let friends = storage.friends_of("a").unwrap();
        assert_eq!(friends.len(), 2);
        assert_eq!(friends[0].friend_id, "b");
        assert_eq!(friends[1].friend_id, "c");
    }
}
