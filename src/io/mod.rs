//! Collaborators around the core: reading samples and writing run artifacts.
//! Nothing in the core depends on this module.

pub mod loader;
pub mod sink;
