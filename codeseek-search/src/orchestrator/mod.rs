//! Query orchestration: normalization, fan-out, dedup, ranking.
//!
//! [`search::QueryOrchestrator`] ties the pieces together. The submodules
//! are pure functions over candidates and can be used on their own.

pub mod dedup;
pub mod normalize;
pub mod ranking;
pub mod search;

pub use search::QueryOrchestrator;
