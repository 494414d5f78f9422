//! Edge-triggered tamper alarm latch
//!
//! Tracks the previous debounced tamper value and reports each edge
//! exactly once, regardless of how often the sensor is polled. Tamper
//! and failed-credential lockout are independent alarm domains - this
//! latch never touches the lockout machine.

/// Edge reported by the latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TamperEdge {
    /// Rising edge: enclosure opened / sensor triggered
    Triggered,
    /// Falling edge: sensor back to normal
    Cleared,
}

#[derive(Debug, Clone)]
pub struct TamperLatch {
    active: bool,
}

impl TamperLatch {
    pub fn new(initial: bool) -> Self {
        Self { active: initial }
    }

    /// Feed the debounced tamper value. Returns an edge only on change.
    pub fn update(&mut self, debounced: bool) -> Option<TamperEdge> {
        if debounced == self.active {
            return None;
        }
        self.active = debounced;
        if debounced {
            Some(TamperEdge::Triggered)
        } else {
            Some(TamperEdge::Cleared)
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edge_reported_once() {
        let mut latch = TamperLatch::new(false);

        assert_eq!(latch.update(true), Some(TamperEdge::Triggered));
        // Repeated polls while triggered stay quiet
        assert_eq!(latch.update(true), None);
        assert_eq!(latch.update(true), None);
        assert!(latch.is_active());
    }

    #[test]
    fn test_falling_edge_reported_once() {
        let mut latch = TamperLatch::new(false);

        latch.update(true);
        assert_eq!(latch.update(false), Some(TamperEdge::Cleared));
        assert_eq!(latch.update(false), None);
        assert!(!latch.is_active());
    }

    #[test]
    fn test_initial_triggered_state() {
        // Device may boot with the enclosure already open
        let mut latch = TamperLatch::new(true);
        assert!(latch.is_active());
        assert_eq!(latch.update(true), None);
        assert_eq!(latch.update(false), Some(TamperEdge::Cleared));
    }
}
