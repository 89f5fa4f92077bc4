//! ParlamentoDB Common Library
//!
//! Shared types and utilities for the ParlamentoDB workspace:
//!
//! - **Logging**: centralized `tracing` subscriber configuration
//! - **Types**: shared domain types (entity types, partitions)
//! - **Hash**: content hashing for synthetic identifiers
//!
//! # Example
//!
//! ```no_run
//! use parlamento_common::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::from_env().unwrap_or_default();
//! init_logging(&config).unwrap();
//! ```

pub mod hash;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{EntityType, Partition};
