//! Shared types for the MoodSync client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::{Secret, serialize_exposed};
