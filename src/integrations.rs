//! Third-party integrations
//!
//! Provider definitions, config masking and connection probes, plus the
//! HuggingFace model importer.

pub mod huggingface;
pub mod providers;

pub use providers::Provider;
