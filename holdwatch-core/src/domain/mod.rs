//! Domain types: positions, snapshots, and the classified change set.

pub mod change;
pub mod position;
pub mod snapshot;

pub use change::{CategoryCounts, ChangeCategory, ChangeEntry, ChangeSet, PercentChange};
pub use position::Position;
pub use snapshot::{is_quarter_end, Snapshot};
