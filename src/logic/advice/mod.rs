//! Advice Module - Remediation Guidance
//!
//! Knowledge-base client (retrieval-augmented service over HTTP), the
//! built-in playbook used whenever that service is absent or unhelpful,
//! and role-aware guidance for stored alerts.

pub mod client;
pub mod playbook;
pub mod guidance;

// Re-export common types
pub use client::{AdviceClient, AdviceConfig, AdviceError};
pub use playbook::playbook_for;
pub use guidance::{guidance_for, templates};

use serde::{Deserialize, Serialize};

/// Remediation text plus the documents it was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub advice: String,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
}
