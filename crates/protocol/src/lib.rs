pub mod item_id;
pub mod render_info;
pub mod types;
pub mod view_params;

pub use item_id::ItemId;
pub use render_info::{Fingerprint, RenderInfo};
pub use types::{DisplayWindow, RelationKind, TrackedItem};
pub use view_params::{ActiveSelection, ViewParameters};
