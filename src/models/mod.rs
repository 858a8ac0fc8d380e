//! Data models for the workflows

pub mod access;
pub mod identity;
pub mod record;
pub mod workflow;

// Re-export commonly used types
pub use access::{Access, AccessLevel, Embargo, EMBARGO_SENTINEL};
pub use identity::Identity;
pub use record::{ImportOutcome, RecordItem};
pub use workflow::{
    Entry, OpenaccessEntry, OpenaccessStage, Stage, ThesesEntry, ThesesStage,
};
