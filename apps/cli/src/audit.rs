//! Domain events of one invocation, written to the log when the command ends.

use sercha_core::{DomainEvent, EventBus, EventReceiver};
use tracing::{error, info, warn};

pub struct AuditLog {
    receiver: EventReceiver,
}

impl AuditLog {
    /// Subscribe before running the command so nothing is missed.
    pub fn subscribe(bus: &EventBus) -> Self {
        Self {
            receiver: bus.subscribe(),
        }
    }

    /// Log everything emitted so far. Returns the ids of sources that were
    /// left behind by a failed rollback.
    pub fn flush(&mut self) -> Vec<String> {
        let mut orphaned = Vec::new();
        while let Some(event) = self.receiver.try_recv() {
            log_event(&event);
            if let DomainEvent::SourceOrphaned { source_id, .. } = event {
                orphaned.push(source_id);
            }
        }
        orphaned
    }
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::SourceOrphaned { source_id, reason } => {
            error!(source_id = %source_id, reason = %reason, "[Audit] Source needs manual cleanup");
        }
        DomainEvent::OAuthFlowFailed {
            connector_id,
            error,
        } => {
            warn!(connector_id = %connector_id, error = %error, "[Audit] Authorization failed");
        }
        other => {
            info!(
                event_type = other.type_name(),
                source_id = other.source_id().unwrap_or(""),
                "[Audit] {}",
                other.type_name()
            );
        }
    }
}
