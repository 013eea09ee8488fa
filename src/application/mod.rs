//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with the classifier port to
//! implement the predict action and the session around it.

pub(crate) mod prediction;
mod session;

pub use prediction::PredictionService;
pub use session::{Session, SessionOutcome, SessionState};
