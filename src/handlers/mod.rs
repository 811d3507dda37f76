//! HTTP handlers

pub mod health;
pub mod inference;
pub mod model;
pub mod alerts;
pub mod triage;
pub mod guidance;
