use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation signal shared by every subscription of one synchronizer.
///
/// Ending the scope stops all of them at once; there is no per-subscription
/// teardown.
#[derive(Debug, Clone)]
pub struct Scope {
    ended: Arc<watch::Sender<bool>>,
}

impl Scope {
    pub fn new() -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            ended: Arc::new(ended),
        }
    }

    pub fn end(&self) {
        self.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended.borrow()
    }

    /// Resolves once the scope has ended, immediately if it already has.
    pub fn ended(&self) -> impl Future<Output = ()> + Send + 'static + use<> {
        let mut rx = self.ended.subscribe();
        async move {
            let _ = rx.wait_for(|ended| *ended).await;
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
