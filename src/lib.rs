//! Driver update agent (DUA) automation
//!
//! Patches Intel driver INF files with project-specific hardware IDs and
//! registry settings, and drives the surrounding DUA submission workflow.

pub mod domain;
pub use domain::{ConfigError, ConfigNode, InfType, ProjectConfig, patch};

/// Reading, patching and writing INF files on disk.
pub mod storage;
pub use storage::{Codec, Destination, PatchError, PatchReport, WriteOptions, patch_inf_file};

/// The DUA and submission workflows and their collaborators.
pub mod workflow;
