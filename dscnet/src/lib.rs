//! # DSCNet-Burn
//!
//! This crate provides a Rust implementation of the DSCNet backbone, built on
//! Dynamic Snake Convolution, using the Burn deep learning framework.
//!
//! ## Modules
//!
//! - `config`: Contains the backbone configuration and the derived channel schedule.
//! - `error`: Defines the custom error types used throughout the crate.
//! - `models`: Implements the backbone and its building blocks, including the offset
//!   predictor, the snake coordinate field and the snake convolution.
//! - `tests`: Includes configuration validation tests.
//!
//! ## Key Components
//!
//! - `DscNet`: The backbone module returning a `FeaturePyramid`.
//! - `DscNetConfig`: The configuration struct that drives the backbone's construction.
//! - `DSConv`: A single dynamic snake convolution, usable on its own.
//! - `DscNetError`: The enum for all possible errors.

mod config;
mod error;
mod models;


#[doc(inline)]
pub use config::{
    DscNetConfig, Morph, PyramidLevel, ShapeSpec, INPUT_CHANNELS, NUM_STAGES, SIZE_DIVISIBILITY,
    STAGE_MULTIPLIERS,
};
#[doc(inline)]
pub use error::{DscNetError, DscNetResult};
#[doc(inline)]
pub use models::modules::{
    accumulate_offsets, CoordinateFieldBuilder, CoordinateGrid, DSConv, DSConvConfig,
    DSConvRecord, OffsetPredictor, OffsetPredictorConfig, StandardConv, StandardConvConfig,
    TripletStage, TripletStageConfig,
};
#[doc(inline)]
pub use models::{DscNet, DscNetRecord, FeaturePyramid, PyramidFeature};
