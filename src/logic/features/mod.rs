//! Features Module - Schema Registry & Input Alignment
//!
//! Training-time schema (ordered feature names + labels) and the aligner
//! that maps request payloads onto it.

pub mod artifacts;
pub mod schema;
pub mod align;

// Re-export common types
pub use artifacts::{ArtifactLocator, ArtifactPaths};
pub use schema::{FeatureSchema, SchemaError, SchemaInfo};
pub use align::{align, AlignedRow, AlignedValue, RawFeatures};
