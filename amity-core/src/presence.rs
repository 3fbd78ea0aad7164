// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transient typing state.
//!
//! Tracks which users are currently composing in which room. Nothing here
//! is persisted: entries are removed when the user stops typing, when the
//! connection drops, or by the gateway's stale sweep after the typing TTL.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct TypingState {
    room_id: String,
    last_typing_at: Instant,
}

/// Per-user typing flags, keyed by user id.
#[derive(Default)]
pub struct TypingTracker {
    states: RwLock<HashMap<String, TypingState>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        TypingTracker {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Records a typing signal. A `show` refreshes the timestamp; a
    /// `hidden` clears the entry.
    pub fn set_typing(&self, user_id: &str, room_id: &str, typing: bool) {
        let mut states = self.states.write().unwrap();
        if typing {
            states.insert(
                user_id.to_string(),
                TypingState {
                    room_id: room_id.to_string(),
                    last_typing_at: Instant::now(),
                },
            );
        } else {
            states.remove(user_id);
        }
    }

    pub fn is_typing(&self, user_id: &str) -> bool {
        self.states.read().unwrap().contains_key(user_id)
    }

    /// Clears a user's typing state on disconnect. Returns the room the
    /// user was typing in, so the gateway can broadcast a final `hidden`.
    pub fn clear(&self, user_id: &str) -> Option<String> {
        self.states
            .write()
            .unwrap()
            .remove(user_id)
            .map(|state| state.room_id)
    }

    /// Removes entries older than `ttl` and returns the `(user, room)`
    /// pairs that were swept.
    pub fn sweep_stale(&self, ttl: Duration) -> Vec<(String, String)> {
        let mut states = self.states.write().unwrap();
        let now = Instant::now();
        let stale: Vec<String> = states
            .iter()
            .filter(|(_, state)| now.duration_since(state.last_typing_at) >= ttl)
            .map(|(user_id, _)| user_id.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|user_id| {
                states
                    .remove(&user_id)
                    .map(|state| (user_id, state.room_id))
            })
            .collect()
    }

    pub fn typing_count(&self) -> usize {
        self.states.read().unwrap().len()
    }
}
