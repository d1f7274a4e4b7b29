use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// In-memory topic registry for live websocket connections.
///
/// One instance is constructed at process start and shared by handle; it is
/// the only mutable state the publish path touches. Per-connection delivery
/// goes through a bounded channel so a slow subscriber can never block the
/// publisher: a connection whose buffer is full is disconnected.
pub struct RealtimeGateway {
    state: Mutex<GatewayState>,
    buffer_capacity: usize,
}

#[derive(Default)]
struct GatewayState {
    connections: HashMap<Uuid, ConnectionEntry>,
    topics: HashMap<String, HashSet<Uuid>>,
}

struct ConnectionEntry {
    user_id: Uuid,
    tx: mpsc::Sender<String>,
    topics: HashSet<String>,
}

impl RealtimeGateway {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            state: Mutex::new(GatewayState::default()),
            buffer_capacity,
        }
    }

    /// Register a live connection for an authenticated user. Returns the
    /// connection id and the receiving end of its outbound buffer.
    pub fn connect(&self, user_id: Uuid) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer_capacity);
        let connection_id = Uuid::new_v4();

        let mut state = self.state.lock().unwrap();
        state.connections.insert(
            connection_id,
            ConnectionEntry {
                user_id,
                tx,
                topics: HashSet::new(),
            },
        );

        info!(
            "Registered connection {} for user {}",
            connection_id, user_id
        );
        (connection_id, rx)
    }

    /// Add a topic to a connection's subscription set. Returns false if the
    /// connection is gone (closed between upgrade and subscribe).
    pub fn subscribe(&self, connection_id: Uuid, topic: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(entry) = state.connections.get_mut(&connection_id) else {
            return false;
        };
        entry.topics.insert(topic.to_string());

        state
            .topics
            .entry(topic.to_string())
            .or_default()
            .insert(connection_id);

        debug!("Connection {} subscribed to {}", connection_id, topic);
        true
    }

    /// Drop one topic from a connection's subscription set.
    pub fn unsubscribe(&self, connection_id: Uuid, topic: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.connections.get_mut(&connection_id) {
            entry.topics.remove(topic);
        }
        remove_from_topic(&mut state, connection_id, topic);
        debug!("Connection {} unsubscribed from {}", connection_id, topic);
    }

    /// Remove a connection and all of its subscriptions. Terminal: a new
    /// connection must re-authenticate and re-subscribe.
    pub fn disconnect(&self, connection_id: Uuid) {
        let mut state = self.state.lock().unwrap();
        remove_connection(&mut state, connection_id);
    }

    /// Deliver a payload to every connection currently subscribed to the
    /// topic. Connections that cannot keep up are disconnected; other
    /// subscribers are unaffected. Returns the number of deliveries.
    pub fn publish(&self, topic: &str, payload: &serde_json::Value) -> usize {
        let text = payload.to_string();

        let mut state = self.state.lock().unwrap();
        let Some(subscribers) = state.topics.get(topic) else {
            debug!("No subscribers for topic {}", topic);
            return 0;
        };
        let subscribers: Vec<Uuid> = subscribers.iter().copied().collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for connection_id in subscribers {
            let Some(entry) = state.connections.get(&connection_id) else {
                continue;
            };
            match entry.tx.try_send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "Connection {} (user {}) fell behind on {}, disconnecting",
                        connection_id, entry.user_id, topic
                    );
                    dead.push(connection_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(connection_id);
                }
            }
        }
        for connection_id in dead {
            remove_connection(&mut state, connection_id);
        }

        debug!("Published to {} ({} deliveries)", topic, delivered);
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.topics.get(topic).map_or(0, |set| set.len())
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().unwrap().connections.len()
    }
}

fn remove_from_topic(state: &mut GatewayState, connection_id: Uuid, topic: &str) {
    if let Some(set) = state.topics.get_mut(topic) {
        set.remove(&connection_id);
        if set.is_empty() {
            state.topics.remove(topic);
        }
    }
}

fn remove_connection(state: &mut GatewayState, connection_id: Uuid) {
    if let Some(entry) = state.connections.remove(&connection_id) {
        for topic in entry.topics {
            remove_from_topic(state, connection_id, &topic);
        }
        info!("Removed connection {}", connection_id);
    }
}
