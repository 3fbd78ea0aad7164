//! WebSocket Connection Handler
//!
//! One task per authenticated user. The first frame must be an
//! AUTHENTICATE event; afterwards inbound intents are processed one at a
//! time in arrival order and routed to the coordinator, the message path,
//! or the typing path. Failures are local: a rejected event is logged and
//! the connection stays usable.

use std::collections::HashMap;
use std::sync::Arc;

use amity_core::protocol::{
    self, ClientEvent, OnlineStatus, OutboundEvent, ServerEvent, TypingIndicator,
};
use amity_core::{CoreResult, FriendCoordinator, Storage, TypingTracker, UserRecord};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::metrics::GatewayMetrics;
use crate::rate_limit::RateLimiter;
use crate::registry::ConnectionRegistry;

/// State shared by every connection task.
pub struct Shared {
    pub storage: Arc<Storage>,
    pub coordinator: Arc<FriendCoordinator>,
    pub registry: Arc<ConnectionRegistry>,
    pub typing: Arc<TypingTracker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: GatewayMetrics,
    pub max_frame_bytes: usize,
    pub history_limit: usize,
}

/// Handles a WebSocket connection end to end.
pub async fn handle_connection(ws_stream: WebSocketStream<TcpStream>, shared: Arc<Shared>) {
    let (mut write, mut read) = ws_stream.split();

    let user = match authenticate(&mut read, &shared).await {
        Some(user) => user,
        None => return,
    };
    info!("user {} authenticated", user.id);

    let (tx, mut rx) = mpsc::unbounded_channel();
    if shared.registry.register(&user.id, tx.clone()).is_some() {
        debug!("replaced existing connection for {}", user.id);
    }
    shared.metrics.connections.inc();

    // Writer task: pumps the outbound queue into the sink so delivery to
    // this user never blocks another user's handler.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
    });

    // Presence is best-effort: a storage failure here must not kill the
    // connection.
    match shared.coordinator.set_online(&user.id, OnlineStatus::Online) {
        Ok(event) => {
            shared.registry.broadcast_except(&user.id, &event);
        }
        Err(e) => warn!("failed to record online status for {}: {}", user.id, e),
    }

    replay_recent_history(&user, &shared, &tx);

    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if text.len() > shared.max_frame_bytes {
                    warn!("frame too large from {}: {} bytes", user.id, text.len());
                    continue;
                }
                if !shared.rate_limiter.allow(&user.id) {
                    shared.metrics.rate_limited.inc();
                    warn!("rate limited: {}", user.id);
                    continue;
                }
                let event = match protocol::decode_client_event(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("failed to decode event from {}: {}", user.id, e);
                        continue;
                    }
                };
                shared.metrics.events_received.inc();
                if let Some(result) = handle_event(event, &user, &shared) {
                    match result {
                        Ok(events) => {
                            let delivered = shared.registry.deliver(&events);
                            shared.metrics.events_delivered.inc_by(delivered as u64);
                        }
                        Err(e) => warn!("event from {} rejected: {}", user.id, e),
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                debug!("client {} sent close", user.id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("error from {}: {}", user.id, e);
                break;
            }
        }
    }

    teardown(&user, &shared, &tx);
    drop(tx);
    let _ = writer.await;
}

/// Routes one decoded intent. Returns None for events that carry no work
/// (duplicate authenticate, unrecognized names).
fn handle_event(
    event: ClientEvent,
    user: &UserRecord,
    shared: &Shared,
) -> Option<CoreResult<Vec<OutboundEvent>>> {
    match event {
        ClientEvent::Authenticate { .. } => {
            debug!("duplicate authenticate from {}", user.id);
            None
        }
        ClientEvent::AddFriend { target_user_id } => {
            Some(shared.coordinator.add_friend(&user.id, &target_user_id))
        }
        ClientEvent::CancelFriend { target_user_id } => {
            Some(shared.coordinator.cancel_friend(&user.id, &target_user_id))
        }
        ClientEvent::RefuseFriend { about_user_id } => {
            Some(shared.coordinator.refuse_friend(&user.id, &about_user_id))
        }
        ClientEvent::AcceptFriend { about_user_id } => {
            Some(shared.coordinator.accept_friend(&user.id, &about_user_id))
        }
        ClientEvent::SendMessage {
            room_id,
            content,
            images,
        } => {
            let result = shared
                .coordinator
                .send_message(&user.id, &room_id, &content, &images);
            if result.is_ok() {
                shared.metrics.messages_relayed.inc();
                // a sent message implicitly ends the typing indicator
                shared.typing.set_typing(&user.id, &room_id, false);
            }
            Some(result)
        }
        ClientEvent::SendTyping { room_id, state } => {
            let result = shared.coordinator.typing(&user.id, &room_id, state);
            if result.is_ok() {
                shared
                    .typing
                    .set_typing(&user.id, &room_id, state == TypingIndicator::Show);
            }
            Some(result)
        }
        ClientEvent::Unknown => {
            debug!("unrecognized event from {}", user.id);
            None
        }
    }
}

/// Reads the first frame and resolves it to a user. A client that closes
/// or drops before sending anything is not an auth failure; only rejected
/// credentials and malformed first frames count.
async fn authenticate(
    read: &mut SplitStream<WebSocketStream<TcpStream>>,
    shared: &Shared,
) -> Option<UserRecord> {
    match read.next().await {
        Some(Ok(Message::Text(text))) => resolve_auth(&text, shared),
        Some(Ok(_)) => {
            shared.metrics.auth_failures.inc();
            warn!("expected text frame for authentication");
            None
        }
        Some(Err(e)) => {
            warn!("error reading authentication frame: {}", e);
            None
        }
        None => {
            debug!("connection closed before authentication");
            None
        }
    }
}

/// Validates the AUTHENTICATE frame that must open every connection.
fn resolve_auth(text: &str, shared: &Shared) -> Option<UserRecord> {
    match protocol::decode_client_event(text) {
        Ok(ClientEvent::Authenticate { token }) => match shared.storage.user_by_token(&token) {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                shared.metrics.auth_failures.inc();
                warn!("unknown session token");
                None
            }
            Err(e) => {
                error!("token lookup failed: {}", e);
                None
            }
        },
        Ok(other) => {
            shared.metrics.auth_failures.inc();
            warn!("expected AUTHENTICATE as first event, got {:?}", other);
            None
        }
        Err(e) => {
            shared.metrics.auth_failures.inc();
            warn!("failed to decode first frame: {}", e);
            None
        }
    }
}

/// Replays the recent messages of each friend room to a freshly connected
/// client, oldest first, so the conversation view has content before any
/// live traffic arrives. Returns the number of frames queued.
fn replay_recent_history(
    user: &UserRecord,
    shared: &Shared,
    tx: &mpsc::UnboundedSender<Message>,
) -> usize {
    let friends = match shared.storage.friends_of(&user.id) {
        Ok(friends) => friends,
        Err(e) => {
            warn!("failed to load friend list for {}: {}", user.id, e);
            return 0;
        }
    };
    let mut names: HashMap<String, String> = HashMap::new();
    let mut sent = 0;
    for entry in friends {
        let messages = match shared
            .storage
            .recent_messages(&entry.room_id, shared.history_limit)
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!("failed to load history for room {}: {}", entry.room_id, e);
                continue;
            }
        };
        for message in messages {
            let full_name = names
                .entry(message.sender_id.clone())
                .or_insert_with(|| {
                    shared
                        .storage
                        .profile(&message.sender_id)
                        .ok()
                        .flatten()
                        .map(|p| p.full_name)
                        .unwrap_or_default()
                })
                .clone();
            let event = ServerEvent::ReturnMessage {
                room_id: message.room_id,
                user_id: message.sender_id,
                full_name,
                content: message.content,
                images: message.images,
            };
            match protocol::encode_server_event(&event) {
                Ok(text) => {
                    if tx.send(Message::Text(text)).is_ok() {
                        sent += 1;
                    }
                }
                Err(e) => warn!("failed to encode history frame: {}", e),
            }
        }
    }
    sent
}

fn teardown(user: &UserRecord, shared: &Shared, tx: &mpsc::UnboundedSender<Message>) {
    let was_current = shared.registry.unregister(&user.id, tx);
    shared.metrics.connections.dec();

    // a replaced connection tears down after its replacement logged in; it
    // must not wipe the live session's state or announce the user offline
    if !was_current {
        return;
    }
    shared.rate_limiter.forget(&user.id);

    // a final `hidden` so peers don't see a ghost typing indicator
    if let Some(room_id) = shared.typing.clear(&user.id) {
        match shared
            .coordinator
            .typing(&user.id, &room_id, TypingIndicator::Hidden)
        {
            Ok(events) => {
                shared.registry.deliver(&events);
            }
            Err(e) => debug!("typing teardown for {} skipped: {}", user.id, e),
        }
    }

    match shared.coordinator.set_online(&user.id, OnlineStatus::Offline) {
        Ok(event) => {
            shared.registry.broadcast_except(&user.id, &event);
        }
        Err(e) => warn!("failed to record offline status for {}: {}", user.id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shared() -> Arc<Shared> {
        let storage = Arc::new(Storage::in_memory().unwrap());
        for (id, name) in [("a", "Alice"), ("b", "Bob")] {
            storage
                .save_user(
                    &UserRecord {
                        id: id.to_string(),
                        full_name: name.to_string(),
                        avatar: String::new(),
                        status_online: OnlineStatus::Offline,
                    },
                    &format!("tok-{}", id),
                )
                .unwrap();
        }
        let coordinator = Arc::new(FriendCoordinator::new(storage.clone()));
        Arc::new(Shared {
            storage,
            coordinator,
            registry: Arc::new(ConnectionRegistry::new()),
            typing: Arc::new(TypingTracker::new()),
            rate_limiter: Arc::new(RateLimiter::new(100)),
            metrics: GatewayMetrics::new(),
            max_frame_bytes: 64 * 1024,
            history_limit: 50,
        })
    }

    fn user(shared: &Shared, token: &str) -> UserRecord {
        shared.storage.user_by_token(token).unwrap().unwrap()
    }

    #[test]
    fn test_add_friend_dispatch_produces_addressed_events() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");

        let events = handle_event(
            ClientEvent::AddFriend {
                target_user_id: "b".to_string(),
            },
            &alice,
            &shared,
        )
        .unwrap()
        .unwrap();

        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.recipient == "b"));
    }

    #[test]
    fn test_unknown_event_carries_no_work() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");
        assert!(handle_event(ClientEvent::Unknown, &alice, &shared).is_none());
    }

    #[test]
    fn test_duplicate_authenticate_ignored() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");
        let result = handle_event(
            ClientEvent::Authenticate {
                token: "tok-a".to_string(),
            },
            &alice,
            &shared,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_message_rejected() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");

        let result = handle_event(
            ClientEvent::SendMessage {
                room_id: "r-1".to_string(),
                content: "  ".to_string(),
                images: Vec::new(),
            },
            &alice,
            &shared,
        )
        .unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_typing_updates_tracker_and_message_clears_it() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");
        let bob = user(&shared, "tok-b");

        // become friends to get a room
        handle_event(
            ClientEvent::AddFriend {
                target_user_id: "b".to_string(),
            },
            &alice,
            &shared,
        );
        handle_event(
            ClientEvent::AcceptFriend {
                about_user_id: "a".to_string(),
            },
            &bob,
            &shared,
        );
        let room_id = shared.storage.friends_of("a").unwrap()[0].room_id.clone();

        let events = handle_event(
            ClientEvent::SendTyping {
                room_id: room_id.clone(),
                state: TypingIndicator::Show,
            },
            &alice,
            &shared,
        )
        .unwrap()
        .unwrap();
        assert!(shared.typing.is_typing("a"));
        assert_eq!(events[0].recipient, "b");
        assert!(matches!(events[0].event, ServerEvent::ReturnTyping { .. }));

        handle_event(
            ClientEvent::SendMessage {
                room_id,
                content: "hi".to_string(),
                images: Vec::new(),
            },
            &alice,
            &shared,
        )
        .unwrap()
        .unwrap();
        assert!(!shared.typing.is_typing("a"));
    }

    #[test]
    fn test_auth_failures_count_rejections_only() {
        let shared = test_shared();

        let user = resolve_auth(r#"{"event":"AUTHENTICATE","token":"tok-a"}"#, &shared);
        assert_eq!(user.unwrap().id, "a");
        assert_eq!(shared.metrics.auth_failures.get(), 0);

        assert!(resolve_auth(r#"{"event":"AUTHENTICATE","token":"bad"}"#, &shared).is_none());
        assert_eq!(shared.metrics.auth_failures.get(), 1);

        assert!(resolve_auth("not json", &shared).is_none());
        assert_eq!(shared.metrics.auth_failures.get(), 2);

        // a non-AUTHENTICATE first event is a protocol violation
        assert!(resolve_auth(r#"{"event":"ADD_FRIEND","targetUserId":"b"}"#, &shared).is_none());
        assert_eq!(shared.metrics.auth_failures.get(), 3);
    }

    #[test]
    fn test_history_replayed_on_connect() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");
        let bob = user(&shared, "tok-b");

        handle_event(
            ClientEvent::AddFriend {
                target_user_id: "b".to_string(),
            },
            &alice,
            &shared,
        );
        handle_event(
            ClientEvent::AcceptFriend {
                about_user_id: "a".to_string(),
            },
            &bob,
            &shared,
        );
        let room_id = shared.storage.friends_of("a").unwrap()[0].room_id.clone();
        shared
            .coordinator
            .send_message("a", &room_id, "hello", &[])
            .unwrap();
        shared
            .coordinator
            .send_message("b", &room_id, "hi back", &[])
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(replay_recent_history(&bob, &shared, &tx), 2);

        // oldest first, own messages included
        match rx.try_recv().unwrap() {
            Message::Text(text) => {
                assert!(text.contains("RETURN_MESSAGE"));
                assert!(text.contains("hello"));
                assert!(text.contains("Alice"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            Message::Text(text) => assert!(text.contains("hi back")),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_history_replay_empty_for_user_without_friends() {
        let shared = test_shared();
        let alice = user(&shared, "tok-a");
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(replay_recent_history(&alice, &shared, &tx), 0);
        assert!(rx.try_recv().is_err());
    }
}
