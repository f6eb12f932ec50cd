//! Core types and traits for the knowledge-graph core.
//!
//! Attribute bags are `serde_json` maps so that both graph backends and every
//! persisted file share one JSON shape.

mod attrs;
mod oracle;
mod storage;
mod traits;
mod triplet;

pub use attrs::*;
pub use oracle::*;
pub use storage::*;
pub use traits::*;
pub use triplet::*;
