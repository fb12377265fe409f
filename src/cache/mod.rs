//! Freshness tracking for extracted saves.
//!
//! Each output directory carries an `analysis.json` entry holding the source
//! modification time it was built from. A missing, unreadable or outdated
//! entry makes the save stale.

mod operations;
mod types;

pub use operations::*;
pub use types::*;
