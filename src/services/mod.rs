pub mod refresher;

pub use refresher::{RefreshCoordinator, RefreshError, RefreshOutcome, RefreshReport, SkipReason};
