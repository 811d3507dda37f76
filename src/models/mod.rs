//! Data models

pub mod alert;
pub mod triage;
pub mod guidance;

pub use alert::*;
pub use triage::*;
pub use guidance::*;
