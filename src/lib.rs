pub mod config;
pub mod dsl;
pub mod utils;

pub use dsl::{FilterError, FilterNode, parse_filter};
