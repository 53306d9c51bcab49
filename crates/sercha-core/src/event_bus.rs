//! Broadcast of domain events
//!
//! Services, the provisioner and the OAuth flow driver hold an
//! [`EventSender`]. The CLI subscribes once per invocation and writes every
//! event to the log; tests subscribe to assert on what was emitted.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::DomainEvent;

/// Events buffered per subscriber before the slowest one starts lagging
const CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Receives only events emitted after this call.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Emitting half handed to services.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventSender {
    /// Fire and forget. With nobody subscribed the event is dropped.
    pub fn emit(&self, event: DomainEvent) {
        let event_type = event.type_name();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event_type, receivers, "[EventBus] Emitted"),
            Err(_) => debug!(event_type, "[EventBus] Dropped, no subscribers"),
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Next event, or `None` once every sender is gone. Lag is logged and skipped.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "[EventBus] Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "[EventBus] Subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
