//! Client Types
//!
//! Configuration and credential types.

pub mod config;
pub mod token;

pub use config::*;
pub use token::*;
