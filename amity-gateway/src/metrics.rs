//! Prometheus metrics for the gateway.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    pub connections: IntGauge,
    pub events_received: IntCounter,
    pub events_delivered: IntCounter,
    pub messages_relayed: IntCounter,
    pub rate_limited: IntCounter,
    pub auth_failures: IntCounter,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let connections =
            IntGauge::new("amity_connections", "Currently connected clients").unwrap();
        let events_received = IntCounter::new(
            "amity_events_received_total",
            "Inbound client events decoded",
        )
        .unwrap();
        let events_delivered = IntCounter::new(
            "amity_events_delivered_total",
            "Outbound events delivered to connected recipients",
        )
        .unwrap();
        let messages_relayed = IntCounter::new(
            "amity_messages_relayed_total",
            "Chat messages persisted and relayed",
        )
        .unwrap();
        let rate_limited = IntCounter::new(
            "amity_rate_limited_total",
            "Inbound events dropped by rate limiting",
        )
        .unwrap();
        let auth_failures = IntCounter::new(
            "amity_auth_failures_total",
            "Connections closed before authentication completed",
        )
        .unwrap();

        registry.register(Box::new(connections.clone())).unwrap();
        registry.register(Box::new(events_received.clone())).unwrap();
        registry.register(Box::new(events_delivered.clone())).unwrap();
        registry.register(Box::new(messages_relayed.clone())).unwrap();
        registry.register(Box::new(rate_limited.clone())).unwrap();
        registry.register(Box::new(auth_failures.clone())).unwrap();

        GatewayMetrics {
            registry,
            connections,
            events_received,
            events_delivered,
            messages_relayed,
            rate_limited,
            auth_failures,
        }
    }

    /// Renders the registry in the Prometheus text format.
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
