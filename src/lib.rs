//! Color refinement, unknown-factor lifting, and parfactor-graph construction
//! for parameterized factor graphs.

pub mod color;
pub mod emit;
pub mod error;
pub mod fg;
pub mod lift;
pub mod persist;
pub mod pfg;
pub mod query;

pub use error::{CoreError, Result};
