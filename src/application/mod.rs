//! Application layer - Use cases and orchestration.
//!
//! Services depend on domain ports (traits) rather than concrete
//! implementations. The session controller ties them into the per-user
//! upload and question workflow.

pub mod services;
pub mod session;

pub use services::{DocumentService, QueryService, RagService};
pub use session::{ChatTurn, Flow, IntakeReport, SessionController, SessionState, SessionView};
