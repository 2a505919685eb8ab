//! Domain model of INF patching.
//!
//! Everything in this module is free of I/O: it turns descriptor text and a
//! project configuration into new descriptor text.

mod config;
pub use config::{ConfigError, ConfigNode, ProjectConfig};

/// Hardware ID matching and subsystem expansion.
pub mod hardware_id;

mod inf_type;
pub use inf_type::{CATALOG_MARKERS, InfType};

/// The single-pass descriptor rewrite.
pub mod patcher;
pub use patcher::{PatchStats, Patched, patch};

/// Registry value declarations and generated registry sections.
pub mod registry;

/// Section tracking for the line scanner.
pub mod section;
