use log::{debug, info, warn};
use tokio::sync::broadcast::{self, error::RecvError, Receiver, Sender};

use crate::device::constants::STATUS_RELAY_CAPACITY;
use crate::device::types::DeviceEvent;

/// Fans every status event out to all current subscribers.
///
/// Publishing never blocks. Each subscriber has a single slot: if it has not consumed the previous
/// event yet, that event is dropped in favour of the newest one.
#[derive(Debug, Clone)]
pub struct StatusRelay {
    sender: Sender<DeviceEvent>,
}

impl StatusRelay {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STATUS_RELAY_CAPACITY);
        StatusRelay { sender }
    }

    pub fn publish(&self, event: DeviceEvent) {
        match &event {
            DeviceEvent::Error(_) => warn!("{}", event),
            DeviceEvent::Completed(outcome) if !outcome.is_ok() => warn!("{}", event),
            DeviceEvent::Requested(_) | DeviceEvent::Discovered(_) => debug!("{}", event),
            _ => info!("{}", event),
        }

        // no subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> StatusSubscriber {
        StatusSubscriber { receiver: self.sender.subscribe() }
    }
}

impl Default for StatusRelay {
    fn default() -> Self {
        StatusRelay::new()
    }
}

pub struct StatusSubscriber {
    receiver: Receiver<DeviceEvent>,
}

impl StatusSubscriber {
    /// Waits for the next event. Returns None once the relay is gone.
    pub async fn next(&mut self) -> Option<DeviceEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Status subscriber skipped {} events", skipped);
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the pending event, if any, without waiting.
    pub fn try_next(&mut self) -> Option<DeviceEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
