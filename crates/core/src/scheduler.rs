use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use timeline_sync_protocol::ViewParameters;

/// Callback of a rendering member, invoked once per broadcast.
pub type MemberCallback = Arc<dyn Fn(&ViewParameters) + Send + Sync>;

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// The timeline is hidden; nothing is queued.
    Dropped,
    /// First request of a debounce window; the caller arms the timer.
    Scheduled,
    /// A broadcast is already scheduled and will cover this request.
    Coalesced,
}

/// Debounce bookkeeping and the member registry.
///
/// The scheduler only decides; arming the timer and running the broadcast
/// belong to the synchronizer, which owns the runtime handle.
pub struct RefreshScheduler {
    delay: Duration,
    pending: bool,
    members: IndexMap<String, MemberCallback>,
}

impl RefreshScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: false,
            members: IndexMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a refresh request. Only the first request of a window returns
    /// [`RefreshRequest::Scheduled`]; later ones do not move the firing time.
    pub fn request(&mut self, visible: bool) -> RefreshRequest {
        if !visible {
            return RefreshRequest::Dropped;
        }
        if self.pending {
            return RefreshRequest::Coalesced;
        }
        self.pending = true;
        RefreshRequest::Scheduled
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Mark the scheduled broadcast as done.
    pub fn finish(&mut self) {
        self.pending = false;
    }

    /// Register `callback` under `name`, replacing any previous callback with
    /// that name. A replaced member keeps its position in the call order.
    pub fn register(&mut self, name: impl Into<String>, callback: MemberCallback) {
        self.members.insert(name.into(), callback);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.members.shift_remove(name).is_some()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Members in registration order, cloned so they can be called without
    /// holding the state lock.
    pub fn members(&self) -> Vec<(String, MemberCallback)> {
        self.members
            .iter()
            .map(|(name, callback)| (name.clone(), Arc::clone(callback)))
            .collect()
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("delay", &self.delay)
            .field("pending", &self.pending)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler() -> RefreshScheduler {
        RefreshScheduler::new(Duration::from_millis(30))
    }

    #[test]
    fn burst_schedules_once() {
        let mut scheduler = scheduler();
        assert_eq!(scheduler.request(true), RefreshRequest::Scheduled);
        for _ in 0..10 {
            assert_eq!(scheduler.request(true), RefreshRequest::Coalesced);
        }
        assert!(scheduler.is_pending());

        scheduler.finish();
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.request(true), RefreshRequest::Scheduled);
    }

    #[test]
    fn hidden_requests_are_not_queued() {
        let mut scheduler = scheduler();
        assert_eq!(scheduler.request(false), RefreshRequest::Dropped);
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.request(true), RefreshRequest::Scheduled);
    }

    #[test]
    fn registration_is_last_write_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut scheduler = scheduler();

        let counter = Arc::clone(&first);
        scheduler.register("bars", Arc::new(move |_: &ViewParameters| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        scheduler.register("grid", Arc::new(|_: &ViewParameters| {}));
        let counter = Arc::clone(&second);
        scheduler.register("bars", Arc::new(move |_: &ViewParameters| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let members = scheduler.members();
        let names: Vec<_> = members.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["bars", "grid"]);

        let params = ViewParameters::new(chrono::NaiveDate::MIN, 30.0);
        for (_, callback) in &members {
            callback(&params);
        }
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_removes_member() {
        let mut scheduler = scheduler();
        scheduler.register("bars", Arc::new(|_: &ViewParameters| {}));
        assert!(scheduler.unregister("bars"));
        assert!(!scheduler.unregister("bars"));
        assert_eq!(scheduler.member_count(), 0);
    }
}
