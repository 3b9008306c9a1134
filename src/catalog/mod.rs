pub mod merge;
pub mod snapshot;

pub use merge::{overlay, MergeFailure};
pub use snapshot::{Catalog, Snapshot};
