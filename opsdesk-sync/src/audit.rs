// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-commit audit events.
//!
//! Events are handed to an [`AuditSink`] after a transaction committed. Emission is best-effort:
//! it never blocks the operation and never fails it, events can get lost when nobody listens or
//! a subscriber lags behind.
use opsdesk_store::{EntityId, RelationKind};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::config::SyncConfig;

/// Committed change of the membership of one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub relation: RelationKind,
    pub owner: EntityId,
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
}

/// Receiver of audit events.
pub trait AuditSink {
    /// Hand over an event. Must return immediately.
    fn emit(&self, event: AuditEvent);
}

/// Discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

/// Publishes events on a broadcast channel, any number of subscribers can listen.
#[derive(Clone, Debug)]
pub struct BroadcastAuditSink {
    tx: broadcast::Sender<AuditEvent>,
}

impl BroadcastAuditSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sink buffering `audit_capacity` events for each subscriber.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.audit_capacity)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.tx.subscribe()
    }
}

impl AuditSink for BroadcastAuditSink {
    fn emit(&self, event: AuditEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!(
                relation = %event.relation,
                owner = event.owner,
                "dropped audit event without subscribers"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use opsdesk_store::RelationKind;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::{AuditEvent, AuditSink, BroadcastAuditSink};
    use crate::config::SyncConfig;

    fn event(owner: u32) -> AuditEvent {
        AuditEvent {
            relation: RelationKind::UserRole,
            owner,
            added: vec![1],
            removed: vec![],
        }
    }

    #[test]
    fn emit_without_subscribers_does_not_fail() {
        let sink = BroadcastAuditSink::new(4);
        sink.emit(event(1));
    }

    #[test]
    fn lagging_subscriber_loses_oldest_events() {
        let sink = BroadcastAuditSink::new(2);
        let mut rx = sink.subscribe();

        for owner in 1..=3 {
            sink.emit(event(owner));
        }

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(1))));
        assert_eq!(rx.try_recv().unwrap(), event(2));
        assert_eq!(rx.try_recv().unwrap(), event(3));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn capacity_from_config() {
        let config = SyncConfig {
            audit_capacity: 4,
            ..SyncConfig::default()
        };
        let sink = BroadcastAuditSink::from_config(&config);
        let mut rx = sink.subscribe();

        for owner in 1..=5 {
            sink.emit(event(owner));
        }

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(1))));
        for owner in 2..=5 {
            assert_eq!(rx.try_recv().unwrap(), event(owner));
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(event(7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "relation": "user_role",
                "owner": 7,
                "added": [1],
                "removed": [],
            })
        );
    }
}
