//! `keyportal-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod scalar;

pub use entity::Entity;
pub use error::DomainError;
pub use id::{PackageId, ToolId, Username};
pub use scalar::ScalarString;
