//! Audit trail for result entry and reception decisions.
//!
//! Pure functions in this crate never write audit events. Services and API handlers build an
//! [`AuditEvent`] after acting and hand it to an [`AuditSink`].

use crate::constants::DEFAULT_AUDIT_CAPACITY;
use crate::submission::SubmissionDecision;
use crate::verification::RejectionCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventKind {
    ValueEntered {
        parameter_id: String,
        raw_value: String,
    },
    NotesUpdated,
    CriticalAcknowledged {
        acknowledged: bool,
    },
    SubmissionEvaluated {
        decision: SubmissionDecision,
    },
    Submitted,
    SampleAccepted,
    SampleRejected {
        category: RejectionCategory,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub site_code: String,
    pub sample_id: String,
    pub operator: String,
    pub kind: AuditEventKind,
}

impl AuditEvent {
    pub fn new(
        site_code: impl Into<String>,
        sample_id: impl Into<String>,
        operator: impl Into<String>,
        kind: AuditEventKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            site_code: site_code.into(),
            sample_id: sample_id.into(),
            operator: operator.into(),
            kind,
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes every event as a structured `tracing` record on the `lims::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let kind = serde_json::to_string(&event.kind).unwrap_or_else(|e| {
            tracing::warn!("failed to serialise audit event kind: {e}");
            String::new()
        });
        tracing::info!(
            target: "lims::audit",
            event_id = %event.id,
            at = %event.at.to_rfc3339(),
            site_code = %event.site_code,
            sample_id = %event.sample_id,
            operator = %event.operator,
            kind = %kind,
            "audit"
        );
    }
}

/// Keeps the most recent events in memory, newest last.
///
/// Once `capacity` events are held the oldest is dropped for each new one, so a long-running
/// server keeps a bounded trail. Durable audit storage belongs to a dedicated sink.
#[derive(Clone, Debug)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    capacity: usize,
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink holding at most `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn events_for(&self, sample_id: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.sample_id == sample_id)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Fans each event out to several sinks.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for FanoutAuditSink {
    fn record(&self, event: AuditEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_events_in_order() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEvent::new(
            "lims.dev.1",
            "SAPP-1",
            "mlt.perera",
            AuditEventKind::CriticalAcknowledged { acknowledged: true },
        ));
        sink.record(AuditEvent::new(
            "lims.dev.1",
            "SAPP-2",
            "mlt.perera",
            AuditEventKind::Submitted,
        ));
        sink.record(AuditEvent::new(
            "lims.dev.1",
            "SAPP-1",
            "mlt.perera",
            AuditEventKind::SubmissionEvaluated {
                decision: SubmissionDecision::allow(),
            },
        ));

        assert_eq!(sink.events().len(), 3);
        let events = sink.events_for("SAPP-1");
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1].kind,
            AuditEventKind::SubmissionEvaluated { .. }
        ));
    }

    #[test]
    fn memory_sink_drops_oldest_beyond_capacity() {
        let sink = MemoryAuditSink::with_capacity(2);
        for sample_id in ["S-1", "S-2", "S-3"] {
            sink.record(AuditEvent::new(
                "lims.dev.1",
                sample_id,
                "mlt.perera",
                AuditEventKind::NotesUpdated,
            ));
        }

        let kept: Vec<String> = sink.events().into_iter().map(|e| e.sample_id).collect();
        assert_eq!(kept, vec!["S-2".to_string(), "S-3".to_string()]);
        assert!(sink.events_for("S-1").is_empty());
        assert_eq!(MemoryAuditSink::with_capacity(0).capacity(), 1);
        assert_eq!(MemoryAuditSink::new().capacity(), DEFAULT_AUDIT_CAPACITY);
    }

    #[test]
    fn fanout_delivers_to_every_sink() {
        let first = MemoryAuditSink::new();
        let second = MemoryAuditSink::new();
        let fanout = FanoutAuditSink::new(vec![
            Arc::new(first.clone()),
            Arc::new(second.clone()),
            Arc::new(TracingAuditSink),
        ]);

        fanout.record(AuditEvent::new(
            "lims.dev.1",
            "77291034",
            "reception.silva",
            AuditEventKind::SampleRejected {
                category: RejectionCategory::Clotted,
            },
        ));

        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events(), first.events());
    }

    #[test]
    fn event_kind_is_tagged() {
        let json = serde_json::to_value(AuditEventKind::ValueEntered {
            parameter_id: "k".into(),
            raw_value: "6.8".into(),
        })
        .expect("serialise");
        assert_eq!(json["type"], "value_entered");
        assert_eq!(json["parameter_id"], "k");
    }
}
