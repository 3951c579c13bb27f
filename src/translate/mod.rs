//! Translate module - typed configuration to values tree.
//!
//! A configuration object is decoded into a generic document and walked.
//! Every scalar leaf is routed through the [`Mappings`] table: the longest
//! registered prefix of the leaf's path decides the destination, and the
//! rest of the source path is appended to it.

mod error;
mod translator;
mod tree;

pub use error::*;
pub use translator::*;
pub use tree::set_tree;

pub(crate) use tree::field_matches;
