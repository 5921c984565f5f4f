//! Core types for butler.
//!
//! - `QueueId`: numeric identifier of a queue entry, the correlation key
//! - `BuildNumber`: numeric identifier of a build within its job
//! - `QueueState`: normalized classification tag of a queue entry
//! - `BuildKind`: normalized type of a build, with placeholder executables
//!   already rewritten to flow runs

mod class;
mod ids;

pub use class::{BuildKind, QueueState, short_class};
pub use ids::{BuildNumber, QueueId, trailing_number};
