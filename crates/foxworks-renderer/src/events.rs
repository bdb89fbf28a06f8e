//! Main-thread event queue.
//!
//! Background LOD workers post completion notices here; the owning thread
//! drains them between its own work, so handlers never run concurrently with
//! other renderer operations. Events carry identities only, never mesh data.

use crossbeam::channel::{self, Receiver, Sender};
use foxworks_core::ObjectId;

use crate::lod::GeneratorId;

/// Event delivered to the owning thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// A generator finished a full LOD set
    LodsReady {
        object: ObjectId,
        generator: GeneratorId,
        generation: u64,
    },
    /// Geometry changed and the viewport should redraw
    RepaintRequested,
}

/// Cloneable producer side of an [`EventQueue`]
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<RenderEvent>,
}

impl EventSender {
    /// Post an event; returns `false` if the queue is gone
    pub fn send(&self, event: RenderEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Queue of events consumed by the owning thread
pub struct EventQueue {
    sender: Sender<RenderEvent>,
    receiver: Receiver<RenderEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self { sender, receiver }
    }

    /// Get a producer handle
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Take all queued events in posting order
    pub fn drain(&self) -> Vec<RenderEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_drain_in_order() {
        let queue = EventQueue::new();
        let sender = queue.sender();

        assert!(sender.send(RenderEvent::RepaintRequested));
        assert!(sender.send(RenderEvent::LodsReady {
            object: ObjectId::new(1),
            generator: GeneratorId::new(9),
            generation: 3,
        }));
        assert_eq!(queue.len(), 2);

        let events = queue.drain();
        assert_eq!(events[0], RenderEvent::RepaintRequested);
        assert!(matches!(events[1], RenderEvent::LodsReady { generation: 3, .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_send_from_other_thread() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        std::thread::spawn(move || {
            sender.send(RenderEvent::RepaintRequested);
        })
        .join()
        .unwrap();
        assert_eq!(queue.drain(), vec![RenderEvent::RepaintRequested]);
    }
}
