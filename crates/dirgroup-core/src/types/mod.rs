//! Core types for dirgroup

mod entry;
mod filter;

pub use entry::*;
pub use filter::*;
