//! Path module - the bracketed path-selector language.
//!
//! Paths address nodes of values trees and manifest documents:
//!
//! ```text
//! path     := element ("." element)*
//! element  := PLAIN | "[" KV "]" | "[" VALUE "]"
//! PLAIN    := ([A-Za-z0-9_/-] | "\.")+
//! KV       := KEY ":" VALUE
//! KEY      := [A-Za-z0-9_-]+
//! ```
//!
//! A literal `:` inside a selector is written `\:`. A literal `.` in a plain
//! key is written `\.`, so `metadata.annotations.sidecar\.istio\.io/inject`
//! has three elements.

mod parse;
mod path;

pub use parse::{is_kv, is_plain, is_value, parse_path, path_kv, path_v, ParseError};
pub use path::*;
