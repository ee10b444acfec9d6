//! Configuration module for DSCNet.
//!
//! This module provides configuration structures and enums for the DSCNet backbone.
//! It is organized into two main submodules:
//! - `core`: Contains the backbone configuration and its channel schedule
//! - `enums`: Contains the enumeration types used in configurations

pub mod core;
pub mod enums;

// Re-export all configuration structures from core
pub use self::core::{
    DscNetConfig, ShapeSpec, INPUT_CHANNELS, NUM_STAGES, SIZE_DIVISIBILITY, STAGE_MULTIPLIERS,
};

// Re-export all enums from enums
pub use enums::{Morph, PyramidLevel};
