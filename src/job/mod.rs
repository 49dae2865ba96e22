//! Job execution module
//!
//! Pushing a walked file set into the page tree, and pulling mapped pages
//! back into local files.

mod executor;
pub mod mirror;
mod pull;
pub mod storage;

pub use executor::{
    Outcome, RunSummary, SkipReason, SyncOptions, Synchronizer, describe, restrict,
};
pub use pull::{Mapping, PullOutcome, PullSource, PullSummary, Puller};
