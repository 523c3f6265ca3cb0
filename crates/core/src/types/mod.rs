//! Core types for Tidesync.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod domain;
pub mod external;
pub mod id;

pub use domain::{ShopDomain, ShopDomainError};
pub use external::ExternalId;
pub use id::*;
