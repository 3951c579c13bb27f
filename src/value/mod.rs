//! Value module - the generic tree shared by values files and manifests.
//!
//! Values trees handed to the renderer and decoded manifest documents are
//! both represented as [`Value`].

mod value;

pub use value::*;
