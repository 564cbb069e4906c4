//! Classification, dispatch, threat filtering and export.

pub mod classifier;
pub mod engine;
pub mod error;
pub mod hash;
pub mod output;
pub mod threat;
pub mod time;
pub mod types;
