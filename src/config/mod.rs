//! Experiment configuration.
//!
//! Loads and validates `choicelab` experiment files: participant and task
//! metadata, phase timing bounds, run structure, and the optional string
//! catalog override.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
