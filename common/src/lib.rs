//! Data-model types shared between the inference core and its callers.
pub mod protocol;

/// Error type.
pub type Error = Box<dyn std::error::Error>;
