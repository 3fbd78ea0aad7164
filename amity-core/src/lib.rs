// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Amity Core Library
//!
//! Friend-graph coordination and two-party chat state for the Amity
//! gateway: wire protocol types, SQLite-backed relationship/room/message
//! stores, the relationship coordinator state machine, and transient typing
//! state.

pub mod error;
pub mod presence;
pub mod protocol;
pub mod social;
pub mod storage;

pub use error::{CoreError, CoreResult};
pub use presence::TypingTracker;
pub use protocol::{
    ClientEvent, OnlineStatus, OutboundEvent, RoomId, ServerEvent, TypingIndicator, UserId,
    UserSummary,
};
pub use social::{FriendCoordinator, PairState};
pub use storage::{
    FriendEntry, Room, RoomParticipant, Storage, StorageError, StoredMessage, UserRecord,
};
