//! Record types produced by the consolidation pipeline
//!
//! Companies own their directors, and both own their contacts. Every scalar
//! field is tagged with the source that supplied it so merges can resolve
//! precedence and callers can see where a value came from.

mod contact;
mod types;

pub use contact::*;
pub use types::*;
