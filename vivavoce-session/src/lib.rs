//! Vivavoce session library
//!
//! Configuration, JSON-lines events and the session type shared by the
//! `vivavoce` binary and integration tests.

pub mod config;
pub mod events;
pub mod session;

pub use config::SessionConfig;
pub use events::SessionEvent;
pub use session::{InterviewSession, PlannedQuestion};
