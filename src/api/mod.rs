//! API module - the typed control-plane installation description.
//!
//! A [`ControlPlaneSpec`] is what users write. [`default_mappings`] turns it
//! into the values tree consumed by component charts; per-component
//! overlays are kept out of that tree and applied to rendered manifests.

mod components;
mod mappings;
mod types;

pub use components::*;
pub use mappings::default_mappings;
pub use types::*;
