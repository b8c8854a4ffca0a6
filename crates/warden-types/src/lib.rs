//! Warden Types - Shared domain types
//!
//! This crate contains the types both verification paths agree on:
//! - Claims and the normalized session record
//! - Identity provider kinds and login options
//! - Session and token status

pub mod claims;
pub mod provider;
pub mod status;
pub mod error;

pub use claims::*;
pub use provider::*;
pub use status::*;
pub use error::*;
