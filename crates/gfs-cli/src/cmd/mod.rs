pub mod completions;
pub mod explain;
pub mod filter;
