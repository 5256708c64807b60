//! Keeps a Gantt-style timeline consistent with a live set of work items.
//!
//! [`TimelineSynchronizer`] owns the display window, debounces refresh
//! requests into broadcasts to named rendering members, feeds one render
//! stream per item, and runs the relation selection mode.

pub mod config;
pub mod error;
pub mod feed;
pub mod host;
mod render_stream;
pub mod scheduler;
pub mod scope;
pub mod selection;
pub mod synchronizer;
pub mod tracker;
pub mod window;

pub use config::{ConfigError, SyncConfig};
pub use error::{CollaboratorError, SyncError};
pub use feed::ItemFeed;
pub use host::{
    Clock, ErrorContext, FixedClock, HostSignals, ItemSource, NoopSurface, NotificationService,
    RelationService, SystemClock, TimelineHeader, TimelineSurface, TimelineVisibility,
    TypeMetadataLoader,
};
pub use synchronizer::{TimelineSynchronizer, TimelineSynchronizerBuilder};
