// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Unified error type for coordinator operations.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the coordinator and message path.
///
/// Precondition-not-met transitions (e.g. accepting a request that was never
/// sent) are not errors: they are silent no-ops per the state machine.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage operation failed; the transition was aborted and no events
    /// were emitted.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The referenced user does not exist.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The referenced room does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// The sender is not a participant of the room.
    #[error("user {user_id} is not a participant of room {room_id}")]
    NotAParticipant { user_id: String, room_id: String },

    /// A message must carry content or at least one image.
    #[error("message has no content and no images")]
    EmptyMessage,
}

/// Result type for coordinator operations.
pub type CoreResult<T> = Result<T, CoreError>;
