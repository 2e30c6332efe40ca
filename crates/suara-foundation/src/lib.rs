//! Foundation types for Suara: the session lifecycle state and its
//! observable manager.

pub mod state;

pub use state::*;
