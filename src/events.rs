//! Event system for timeline updates
//!
//! Every time the latest-pointer registry installs a new head for a
//! timeline it emits a [`TimelineUpdate`]. Special-index and config writes are
//! emitted as well so observers can follow the registry's bookkeeping.

use crate::ibgib::{Address, IbGib};
use crate::special::SpecialType;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// New head installed for a timeline
#[derive(Debug, Clone)]
pub struct TimelineUpdate {
    pub tjp_addr: Address,
    pub latest_addr: Address,
    pub latest_ibgib: IbGib,
}

/// Events emitted by a space context
#[derive(Debug, Clone)]
pub enum SpaceEvent {
    TimelineUpdated(TimelineUpdate),
    SpecialUpdated {
        special_type: SpecialType,
        addr: Address,
    },
    ConfigUpdated {
        key: String,
        addr: Address,
        space_root_addr: Address,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &SpaceEvent);
}

/// Event bus for broadcasting space events
pub struct EventBus {
    sender: broadcast::Sender<SpaceEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: SpaceEvent) {
        trace!(event = ?event, "Emitting space event");
        // no subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpaceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every event
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &SpaceEvent) {
        match event {
            SpaceEvent::TimelineUpdated(update) => {
                info!(tjp = %update.tjp_addr, latest = %update.latest_addr, "Timeline updated");
            }
            SpaceEvent::SpecialUpdated { special_type, addr } => {
                debug!(special = %special_type, addr = %addr, "Special index updated");
            }
            SpaceEvent::ConfigUpdated { key, addr, .. } => {
                debug!(key = %key, addr = %addr, "Config updated");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let node = IbGib::primitive("tag");

        bus.emit(SpaceEvent::TimelineUpdated(TimelineUpdate {
            tjp_addr: node.addr(),
            latest_addr: node.addr(),
            latest_ibgib: node.clone(),
        }));

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            SpaceEvent::TimelineUpdated(update) => {
                assert_eq!(update.latest_addr, node.addr());
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(SpaceEvent::SpecialUpdated {
            special_type: SpecialType::Tags,
            addr: IbGib::primitive("tags").addr(),
        });
    }
}
