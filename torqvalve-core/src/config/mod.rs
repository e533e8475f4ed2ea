//! Configuration types
//!
//! Board-agnostic configuration structures and the text format they are
//! loaded from.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
