// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Relationship Coordinator
//!
//! The state machine over the friend-request lifecycle. For every ordered
//! pair the states are: no relationship, a pending request, or a confirmed
//! friendship with a shared room. All transitions for a pair run under the
//! pair's mutex, and outbound events are computed only after every mutation
//! for the transition has succeeded, so peers never observe a partial
//! broadcast.

mod pair_lock;

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::protocol::{OnlineStatus, OutboundEvent, ServerEvent, TypingIndicator};
use crate::storage::{RoomParticipant, Storage, ROOM_TYPE_FRIEND};

use pair_lock::PairLocks;

/// Validates and applies relationship transitions, creates the shared room
/// on acceptance, and computes the addressed events to deliver.
///
/// The coordinator is the only writer of relationship and room state.
pub struct FriendCoordinator {
    storage: Arc<Storage>,
    pair_locks: PairLocks,
}

impl FriendCoordinator {
    pub fn new(storage: Arc<Storage>) -> Self {
        FriendCoordinator {
            storage,
            pair_locks: PairLocks::new(),
        }
    }

    /// `by` sends a friend request to `to`.
    ///
    /// Idempotent: re-sending an already pending request leaves the stored
    /// state unchanged and re-emits the same UI events.
    pub fn add_friend(&self, by: &str, to: &str) -> CoreResult<Vec<OutboundEvent>> {
        if by == to {
            return Ok(Vec::new());
        }
        if !self.storage.user_exists(to)? {
            return Err(CoreError::UnknownUser(to.to_string()));
        }

        let lock = self.pair_locks.pair(by, to);
        let _guard = lock.lock().unwrap();

        self.storage.push_request(by, to)?;
        self.storage.push_accept(to, by)?;

        let badge = self.storage.accept_count(to)?;
        let mut events = vec![OutboundEvent::to(
            to,
            ServerEvent::ReturnLengthAcceptFriend {
                user_id: to.to_string(),
                length_accept_friends: badge,
            },
        )];
        if let Some(info) = self.storage.profile(by)? {
            events.push(OutboundEvent::to(
                to,
                ServerEvent::ReturnInfoAcceptFriend {
                    user_id: to.to_string(),
                    info_user_a: info,
                },
            ));
        }
        events.push(OutboundEvent::to(
            to,
            ServerEvent::ReturnUserIdCancelFriend {
                user_id_a: by.to_string(),
                user_id_b: to.to_string(),
            },
        ));
        Ok(events)
    }

    /// `by` withdraws the request previously sent to `to`. No-op if no
    /// request is pending.
    pub fn cancel_friend(&self, by: &str, to: &str) -> CoreResult<Vec<OutboundEvent>> {
        let lock = self.pair_locks.pair(by, to);
        let _guard = lock.lock().unwrap();

        self.storage.pull_request(by, to)?;
        self.storage.pull_accept(to, by)?;

        let badge = self.storage.accept_count(to)?;
        Ok(vec![
            OutboundEvent::to(
                to,
                ServerEvent::ReturnLengthAcceptFriend {
                    user_id: to.to_string(),
                    length_accept_friends: badge,
                },
            ),
            OutboundEvent::to(
                to,
                ServerEvent::ReturnUserIdCancelFriend {
                    user_id_a: by.to_string(),
                    user_id_b: to.to_string(),
                },
            ),
        ])
    }

    /// `by` refuses the request received from `about`. No-op if no request
    /// is pending. The requester gets the removal signal for UI cleanup.
    pub fn refuse_friend(&self, by: &str, about: &str) -> CoreResult<Vec<OutboundEvent>> {
        let lock = self.pair_locks.pair(by, about);
        let _guard = lock.lock().unwrap();

        self.storage.pull_accept(by, about)?;
        self.storage.pull_request(about, by)?;

        Ok(vec![OutboundEvent::to(
            about,
            ServerEvent::ReturnUserIdCancelFriend {
                user_id_a: about.to_string(),
                user_id_b: by.to_string(),
            },
        )])
    }

    /// `by` accepts the request received from `about`.
    ///
    /// The transition is all-or-nothing: unless the request is pending on
    /// both sides when the pair lock is held, nothing is mutated and no
    /// room is created. On success the room is reserved first, then both
    /// friend-list entries and the pending-set clears are committed in one
    /// transaction; if that commit fails the reserved room is discarded.
    pub fn accept_friend(&self, by: &str, about: &str) -> CoreResult<Vec<OutboundEvent>> {
        if by == about {
            return Ok(Vec::new());
        }
        let lock = self.pair_locks.pair(by, about);
        let _guard = lock.lock().unwrap();

        // Already friends: a leftover request between the pair is cleared
        // without touching the existing room.
        if self.storage.friend_entry(by, about)?.is_some() {
            self.storage.pull_accept(by, about)?;
            self.storage.pull_request(about, by)?;
            return Ok(Vec::new());
        }

        let pending_received = self.storage.accept_exists(by, about)?;
        let pending_sent = self.storage.request_exists(about, by)?;
        if !pending_received || !pending_sent {
            return Ok(Vec::new());
        }

        let room_id = self.storage.create_room(
            ROOM_TYPE_FRIEND,
            &[
                RoomParticipant::super_admin(about),
                RoomParticipant::super_admin(by),
            ],
        )?;
        if let Err(e) = self.storage.record_friendship(about, by, &room_id) {
            let _ = self.storage.delete_room(&room_id);
            return Err(e.into());
        }

        // The room is visible through both friend lists; no explicit
        // confirmation event is emitted.
        Ok(Vec::new())
    }

    /// Persists a message to a room and computes the fan-out to the room's
    /// other participants. The message is stored before any event is
    /// returned.
    pub fn send_message(
        &self,
        sender: &str,
        room_id: &str,
        content: &str,
        images: &[String],
    ) -> CoreResult<Vec<OutboundEvent>> {
        let content = content.trim();
        if content.is_empty() && images.is_empty() {
            return Err(CoreError::EmptyMessage);
        }
        let (participants, profile) = self.room_context(sender, room_id)?;

        let stored = self.storage.save_message(room_id, sender, content, images)?;

        Ok(participants
            .into_iter()
            .filter(|p| p.user_id != sender)
            .map(|p| {
                OutboundEvent::to(
                    p.user_id,
                    ServerEvent::ReturnMessage {
                        room_id: room_id.to_string(),
                        user_id: sender.to_string(),
                        full_name: profile.full_name.clone(),
                        content: stored.content.clone(),
                        images: stored.images.clone(),
                    },
                )
            })
            .collect())
    }

    /// Relays a typing indicator to the room's other participants. Nothing
    /// is persisted.
    pub fn typing(
        &self,
        sender: &str,
        room_id: &str,
        state: TypingIndicator,
    ) -> CoreResult<Vec<OutboundEvent>> {
        let (participants, profile) = self.room_context(sender, room_id)?;

        Ok(participants
            .into_iter()
            .filter(|p| p.user_id != sender)
            .map(|p| {
                OutboundEvent::to(
                    p.user_id,
                    ServerEvent::ReturnTyping {
                        room_id: room_id.to_string(),
                        user_id: sender.to_string(),
                        full_name: profile.full_name.clone(),
                        state,
                    },
                )
            })
            .collect())
    }

    /// Records a presence change and returns the status event to broadcast.
    pub fn set_online(&self, user_id: &str, status: OnlineStatus) -> CoreResult<ServerEvent> {
        self.storage.set_status(user_id, status)?;
        Ok(ServerEvent::ReturnUserStatusOnline {
            user_id: user_id.to_string(),
            status,
        })
    }

    fn room_context(
        &self,
        sender: &str,
        room_id: &str,
    ) -> CoreResult<(Vec<RoomParticipant>, crate::protocol::UserSummary)> {
        let participants = self.storage.room_participants(room_id)?;
        if participants.is_empty() {
            return Err(CoreError::RoomNotFound(room_id.to_string()));
        }
        if !participants.iter().any(|p| p.user_id == sender) {
            return Err(CoreError::NotAParticipant {
                user_id: sender.to_string(),
                room_id: room_id.to_string(),
            });
        }
        let profile = self
            .storage
            .profile(sender)?
            .ok_or_else(|| CoreError::UnknownUser(sender.to_string()))?;
        Ok((participants, profile))
    }
}

/// Convenience for tests and callers that only need the pair's resting
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    None,
    Requested,
    Friends,
}

impl FriendCoordinator {
    /// The resting state of the ordered pair `(requester, target)`.
    pub fn pair_state(&self, requester: &str, target: &str) -> CoreResult<PairState> {
        if self.storage.friend_entry(requester, target)?.is_some() {
            return Ok(PairState::Friends);
        }
        if self.storage.request_exists(requester, target)? {
            return Ok(PairState::Requested);
        }
        Ok(PairState::None)
    }
}
