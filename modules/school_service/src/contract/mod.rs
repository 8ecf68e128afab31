//! Contract layer - public models, inputs and errors
//!
//! This layer contains transport-agnostic types used by every other layer.

pub mod error;
pub mod input;
pub mod model;

pub use error::SchoolError;
pub use input::*;
pub use model::*;
