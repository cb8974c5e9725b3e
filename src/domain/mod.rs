//! Core types and the ports the outer layers implement.

pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::*;
pub use errors::{DomainError, Result};
