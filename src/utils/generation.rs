use std::sync::atomic::{AtomicU64, Ordering};

/// Stamp issued when a request starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out increasing tickets so a view can tell whether a response
/// belongs to the most recent request it issued.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Slot holding the value of the newest request only.
/// Responses that arrive after a newer one has been accepted are dropped.
#[derive(Debug)]
pub struct Latest<T> {
    accepted: Option<(Ticket, T)>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self { accepted: None }
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and drops `value`) when a newer ticket already landed
    pub fn accept(&mut self, ticket: Ticket, value: T) -> bool {
        if let Some((current, _)) = &self.accepted {
            if *current > ticket {
                tracing::debug!("Dropping stale response {:?} (have {:?})", ticket, current);
                return false;
            }
        }
        self.accepted = Some((ticket, value));
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.accepted.as_ref().map(|(_, value)| value)
    }

    pub fn take(&mut self) -> Option<T> {
        self.accepted.take().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_newest_ticket_is_current() {
        let gate = RequestGate::new();
        let first = gate.begin();
        let second = gate.begin();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }

    #[test]
    fn test_late_response_does_not_overwrite() {
        let gate = RequestGate::new();
        let first = gate.begin();
        let second = gate.begin();

        let mut slot = Latest::new();
        assert!(slot.accept(second, "second"));
        assert!(!slot.accept(first, "first"));
        assert_eq!(slot.get(), Some(&"second"));
    }

    #[test]
    fn test_in_order_responses_replace() {
        let gate = RequestGate::new();
        let mut slot = Latest::new();
        assert!(slot.accept(gate.begin(), 1));
        assert!(slot.accept(gate.begin(), 2));
        assert_eq!(slot.take(), Some(2));
        assert_eq!(slot.get(), None);
    }
}
