use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Observable state of a fetching component: last good data plus the outcome
/// of the most recent attempt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
    /// Set once any fetch has committed; `data` is the initial value until then.
    pub loaded: bool,
}

/// Monotonic tag handed out when a fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Holds a component's [`LoadState`] and arbitrates between overlapping
/// fetches: only the newest ticket may write, and nothing writes once the
/// slot is detached.
#[derive(Debug, Default)]
pub struct StateSlot<T> {
    state: Mutex<LoadState<T>>,
    generation: AtomicU64,
    detached: AtomicBool,
}

impl<T: Clone> StateSlot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            state: Mutex::new(LoadState {
                data: initial,
                loading: false,
                error: None,
                loaded: false,
            }),
            generation: AtomicU64::new(0),
            detached: AtomicBool::new(false),
        }
    }

    /// Marks the slot as loading and returns the ticket for this attempt.
    pub fn begin(&self) -> FetchTicket {
        let ticket = FetchTicket(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
        if !self.is_detached() {
            let mut guard = self.state.lock().expect("state mutex poisoned");
            guard.loading = true;
        }
        ticket
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        !self.is_detached() && self.generation.load(Ordering::Acquire) == ticket.0
    }

    /// Replaces the data if `ticket` is still the newest attempt.
    pub fn commit(&self, ticket: FetchTicket, data: T) -> bool {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, "discarding stale fetch result");
            return false;
        }
        guard.data = data;
        guard.loading = false;
        guard.error = None;
        guard.loaded = true;
        true
    }

    /// Records a failure, keeping whatever data was loaded before.
    pub fn fail(&self, ticket: FetchTicket, message: impl Into<String>) -> bool {
        let mut guard = self.state.lock().expect("state mutex poisoned");
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, "discarding stale fetch failure");
            return false;
        }
        guard.loading = false;
        guard.error = Some(message.into());
        true
    }

    pub fn snapshot(&self) -> LoadState<T> {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    pub fn data(&self) -> T {
        self.state.lock().expect("state mutex poisoned").data.clone()
    }

    /// Data from the last committed fetch, `None` while nothing has loaded.
    pub fn last_loaded(&self) -> Option<T> {
        let guard = self.state.lock().expect("state mutex poisoned");
        guard.loaded.then(|| guard.data.clone())
    }

    /// Stops all further writes, the teardown analogue for late results.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_ticket_cannot_overwrite_newer_result() {
        let slot = StateSlot::new(0_u32);
        let slow = slot.begin();
        let fast = slot.begin();

        assert!(slot.commit(fast, 2));
        assert!(!slot.commit(slow, 1));
        assert_eq!(slot.data(), 2);
    }

    #[test]
    fn failure_keeps_previous_data() {
        let slot = StateSlot::new(vec![1, 2, 3]);
        let ticket = slot.begin();
        assert!(slot.snapshot().loading);
        assert!(slot.fail(ticket, "network down"));

        let state = slot.snapshot();
        assert_eq!(state.data, vec![1, 2, 3]);
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("network down"));
    }

    #[test]
    fn initial_value_is_not_reported_as_loaded() {
        let slot = StateSlot::new(0_u32);
        let ticket = slot.begin();
        slot.fail(ticket, "timeout");
        assert_eq!(slot.last_loaded(), None);
        assert!(!slot.snapshot().loaded);

        let ticket = slot.begin();
        slot.commit(ticket, 0);
        assert_eq!(slot.last_loaded(), Some(0));
    }

    #[test]
    fn detached_slot_ignores_late_results() {
        let slot = StateSlot::new(String::from("before"));
        let ticket = slot.begin();
        slot.detach();
        assert!(!slot.commit(ticket, String::from("after")));
        assert_eq!(slot.data(), "before");
    }
}
