//! # Model Architectures
//!
//! This module aggregates the components of the DSCNet backbone:
//!
//! - `dscnet`: Defines the `DscNet` backbone, which stacks six triplet stages and
//!   returns a named feature pyramid.
//! - `modules`: Provides the building blocks, such as the offset predictor, the snake
//!   coordinate field, the snake convolution and the triplet stage.

pub mod dscnet;
pub mod modules;

pub use dscnet::{DscNet, DscNetRecord, FeaturePyramid, PyramidFeature};
