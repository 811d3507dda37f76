//! Logic Module - Triage Engines
//!
//! - `features/` - schema registry, artifact resolution, input alignment
//! - `model/`    - booster, classifier engine, fallback policy
//! - `explain/`  - TreeSHAP attribution engine
//! - `pipeline`  - composition of the above with fallback routing
//! - `advice/`   - knowledge-base client and remediation playbook
//! - `alerts`    - in-memory alert store
//! - `triage`    - end-to-end triage orchestration

pub mod features;
pub mod model;
pub mod explain;
pub mod pipeline;
pub mod advice;
pub mod alerts;
pub mod triage;

#[cfg(test)]
pub mod testutil;
