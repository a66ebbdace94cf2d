//! Turns template source into segments.
pub(crate) mod compile;
pub(crate) mod scanner;
pub mod segments;
pub(crate) mod splitter;
