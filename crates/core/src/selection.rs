use timeline_sync_protocol::{ActiveSelection, ItemId, RelationKind, TrackedItem};

/// A relation ready to be handed to the relation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRelation {
    pub origin_id: ItemId,
    pub kind: RelationKind,
    pub target: TrackedItem,
}

/// Selection mode state machine: `Idle` or `Selecting(origin, kind)`.
///
/// Only one selection runs at a time. Starting another one replaces the
/// running selection, which is abandoned without ever completing.
#[derive(Debug, Default)]
pub struct SelectionModeController {
    active: Option<ActiveSelection>,
}

impl SelectionModeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Selecting`. Returns the abandoned selection, if any.
    pub fn start(&mut self, origin_id: ItemId, kind: RelationKind) -> Option<ActiveSelection> {
        self.active.replace(ActiveSelection { origin_id, kind })
    }

    /// Complete the running selection with `target` and return to `Idle`.
    /// `None` while idle.
    pub fn complete(&mut self, target: TrackedItem) -> Option<PendingRelation> {
        let ActiveSelection { origin_id, kind } = self.active.take()?;
        Some(PendingRelation {
            origin_id,
            kind,
            target,
        })
    }

    /// Return to `Idle` without completing. Returns whether a selection ran.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn active(&self) -> Option<&ActiveSelection> {
        self.active.as_ref()
    }

    pub fn is_selecting(&self) -> bool {
        self.active.is_some()
    }
}
