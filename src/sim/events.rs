//! Presentation side effects emitted by the simulation
//!
//! The core never plays sounds or drives hardware itself. It pushes events
//! and the presentation layer consumes them.

use serde::Serialize;

use super::level::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FieldEvent {
    /// An asteroid struck the ship
    SideHit,
    /// Screen-space angle of the last hit, for the damage indicator overlay
    HitDirection { angle: f32 },
    /// Controller rumble strength per motor
    Rumble { left: f32, right: f32 },
    /// Near-miss whoosh cue
    Whoosh { volume: f32, pan: f32 },
    /// Camera shake request
    CameraWobble { factor: f32 },
    ItemCollected { kind: ItemKind },
}

/// Ordered event buffer for one tick
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<FieldEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, event: FieldEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldEvent> {
        self.events.iter()
    }

    /// Take all queued events, leaving the queue empty
    pub fn drain(&mut self) -> Vec<FieldEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = EventQueue::new();
        queue.push(FieldEvent::SideHit);
        queue.push(FieldEvent::Rumble { left: 0.1, right: 0.2 });
        assert_eq!(queue.len(), 2);

        let events = queue.drain();
        assert!(queue.is_empty());
        assert_eq!(events[0], FieldEvent::SideHit);
        assert!(matches!(events[1], FieldEvent::Rumble { .. }));
    }
}
