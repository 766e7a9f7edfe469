pub mod collector;
pub mod store;

pub use collector::SnapshotCollector;
pub use store::{SnapshotSource, SnapshotStore};
