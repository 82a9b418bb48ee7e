//! Shared configuration and boundary interfaces

pub mod config;
pub mod traits;
