// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Protocol Types
//!
//! JSON event types exchanged between clients and the gateway. Events are
//! internally tagged with an `event` field; event names are SCREAMING_SNAKE
//! and payload fields are camelCase, matching the web client.

use serde::{Deserialize, Serialize};

/// Stable user identifier.
pub type UserId = String;

/// Room identifier (UUID v4).
pub type RoomId = String;

/// Typing indicator state as sent by the client.
///
/// The 3-second auto-clear after the last keystroke is a client-side
/// debounce; the server relays whatever state it is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingIndicator {
    Show,
    Hidden,
}

/// Online/offline presence flag, derived from the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Offline,
}

impl OnlineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OnlineStatus::Online => "online",
            OnlineStatus::Offline => "offline",
        }
    }

    pub fn from_str_or_offline(s: &str) -> Self {
        match s {
            "online" => OnlineStatus::Online,
            _ => OnlineStatus::Offline,
        }
    }
}

/// Public profile summary, as shown in friend-request UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub avatar: String,
    pub full_name: String,
}

/// Intents a connected client may emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientEvent {
    /// Must be the first frame on every connection; the token resolves to
    /// the acting user via the session layer.
    #[serde(rename = "AUTHENTICATE", rename_all = "camelCase")]
    Authenticate { token: String },

    #[serde(rename = "ADD_FRIEND", rename_all = "camelCase")]
    AddFriend { target_user_id: UserId },

    #[serde(rename = "CANCEL_FRIEND", rename_all = "camelCase")]
    CancelFriend { target_user_id: UserId },

    #[serde(rename = "REFUSE_FRIEND", rename_all = "camelCase")]
    RefuseFriend { about_user_id: UserId },

    #[serde(rename = "ACCEPT_FRIEND", rename_all = "camelCase")]
    AcceptFriend { about_user_id: UserId },

    /// At least one of `content` or `images` must be non-empty.
    #[serde(rename = "SEND_MESSAGE", rename_all = "camelCase")]
    SendMessage {
        room_id: RoomId,
        #[serde(default)]
        content: String,
        #[serde(default)]
        images: Vec<String>,
    },

    #[serde(rename = "SEND_TYPING", rename_all = "camelCase")]
    SendTyping {
        room_id: RoomId,
        #[serde(rename = "type")]
        state: TypingIndicator,
    },

    #[serde(other)]
    Unknown,
}

/// Events the gateway delivers to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// Pending-request badge count for `user_id`.
    #[serde(rename = "RETURN_LENGTH_ACCEPT_FRIEND", rename_all = "camelCase")]
    ReturnLengthAcceptFriend {
        user_id: UserId,
        length_accept_friends: usize,
    },

    /// The requester's public profile, delivered to the target of an
    /// ADD_FRIEND.
    #[serde(rename = "RETURN_INFO_ACCEPT_FRIEND", rename_all = "camelCase")]
    ReturnInfoAcceptFriend {
        user_id: UserId,
        info_user_a: UserSummary,
    },

    /// Removal signal keyed by both sides of the pair, for UI cleanup.
    #[serde(rename = "RETURN_USER_ID_CANCEL_FRIEND", rename_all = "camelCase")]
    ReturnUserIdCancelFriend { user_id_a: UserId, user_id_b: UserId },

    #[serde(rename = "RETURN_USER_STATUS_ONLINE", rename_all = "camelCase")]
    ReturnUserStatusOnline {
        user_id: UserId,
        status: OnlineStatus,
    },

    #[serde(rename = "RETURN_MESSAGE", rename_all = "camelCase")]
    ReturnMessage {
        room_id: RoomId,
        user_id: UserId,
        full_name: String,
        content: String,
        images: Vec<String>,
    },

    #[serde(rename = "RETURN_TYPING", rename_all = "camelCase")]
    ReturnTyping {
        room_id: RoomId,
        user_id: UserId,
        full_name: String,
        #[serde(rename = "type")]
        state: TypingIndicator,
    },
}

/// A server event addressed to a specific recipient.
///
/// The coordinator computes these after all mutations for a transition have
/// succeeded; the gateway looks the recipient up in its connection registry.
/// Recipients who are offline at emission time are skipped (no replay).
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub recipient: UserId,
    pub event: ServerEvent,
}

impl OutboundEvent {
    pub fn to(recipient: impl Into<UserId>, event: ServerEvent) -> Self {
        OutboundEvent {
            recipient: recipient.into(),
            event,
        }
    }
}

/// Decodes a client event from a text frame.
pub fn decode_client_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encodes a server event to a text frame.
pub fn encode_server_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_add_friend() {
        let event =
            decode_client_event(r#"{"event":"ADD_FRIEND","targetUserId":"user-b"}"#).unwrap();
        match event {
            ClientEvent::AddFriend { target_user_id } => assert_eq!(target_user_id, "user-b"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_send_typing() {
        let event =
            decode_client_event(r#"{"event":"SEND_TYPING","roomId":"r-1","type":"show"}"#)
                .unwrap();
        match event {
            ClientEvent::SendTyping { room_id, state } => {
                assert_eq!(room_id, "r-1");
                assert_eq!(state, TypingIndicator::Show);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_send_message_defaults() {
        let event = decode_client_event(r#"{"event":"SEND_MESSAGE","roomId":"r-1"}"#).unwrap();
        match event {
            ClientEvent::SendMessage {
                content, images, ..
            } => {
                assert!(content.is_empty());
                assert!(images.is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_name_tolerated() {
        let event = decode_client_event(r#"{"event":"SOMETHING_ELSE","x":1}"#).unwrap();
        assert!(matches!(event, ClientEvent::Unknown));
    }

    #[test]
    fn test_encode_badge_count_shape() {
        let json = encode_server_event(&ServerEvent::ReturnLengthAcceptFriend {
            user_id: "user-b".to_string(),
            length_accept_friends: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"RETURN_LENGTH_ACCEPT_FRIEND","userId":"user-b","lengthAcceptFriends":1}"#
        );
    }

    #[test]
    fn test_encode_info_shape() {
        let json = encode_server_event(&ServerEvent::ReturnInfoAcceptFriend {
            user_id: "user-b".to_string(),
            info_user_a: UserSummary {
                id: "user-a".to_string(),
                avatar: "/a.png".to_string(),
                full_name: "Alice".to_string(),
            },
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"RETURN_INFO_ACCEPT_FRIEND","userId":"user-b","infoUserA":{"id":"user-a","avatar":"/a.png","fullName":"Alice"}}"#
        );
    }

    #[test]
    fn test_encode_status_shape() {
        let json = encode_server_event(&ServerEvent::ReturnUserStatusOnline {
            user_id: "user-a".to_string(),
            status: OnlineStatus::Online,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"RETURN_USER_STATUS_ONLINE","userId":"user-a","status":"online"}"#
        );
    }

    #[test]
    fn test_encode_typing_shape() {
        let json = encode_server_event(&ServerEvent::ReturnTyping {
            room_id: "r-1".to_string(),
            user_id: "user-a".to_string(),
            full_name: "Alice".to_string(),
            state: TypingIndicator::Hidden,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"RETURN_TYPING","roomId":"r-1","userId":"user-a","fullName":"Alice","type":"hidden"}"#
        );
    }
}
