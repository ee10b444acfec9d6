//! Core configuration structures for DSCNet.
//!
//! This module contains the backbone configuration and the derived channel
//! schedule that fixes every internal width from a single embed dimension.

use std::collections::BTreeMap;

use burn::prelude::*;
use serde::Serialize;

use super::enums::PyramidLevel;
use crate::error::{DscNetError, DscNetResult};
use crate::models::modules::{check_kernel_size, group_norm_groups};

/// Number of backbone stages; stage `s > 0` runs at `1 / 2^s` resolution.
pub const NUM_STAGES: usize = 6;

/// Channel multiplier of each stage relative to `embed_dim / 4`.
pub const STAGE_MULTIPLIERS: [usize; NUM_STAGES] = [1, 2, 4, 8, 16, 32];

/// Input spatial sizes must be a multiple of this (five 2x poolings).
pub const SIZE_DIVISIBILITY: usize = 32;

/// Channel count of the image fed to the first stage.
pub const INPUT_CHANNELS: usize = 3;

/// Channel count and stride of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeSpec {
    pub channels: usize,
    pub stride: usize,
}

fn default_out_features() -> Vec<String> {
    PyramidLevel::ALL
        .iter()
        .map(|level| level.name().to_string())
        .collect()
}

/// Configuration of the DSCNet backbone.
#[derive(Config, Debug)]
pub struct DscNetConfig {
    /// Embedding dimension; channel count of `res2`. All other widths derive from it.
    #[config(default = "96")]
    pub embed_dim: usize,
    /// Number of taps of every snake convolution. Must be odd.
    #[config(default = "9")]
    pub kernel_size: usize,
    /// Scale applied to the accumulated offsets.
    #[config(default = "1.0")]
    pub extend_scope: f64,
    /// Apply learned offsets. When false every snake convolution is a plain strided convolution.
    #[config(default = "true")]
    pub apply_offset: bool,
    /// Names and order of the pyramid levels returned by the forward pass.
    #[config(default = "default_out_features()")]
    pub out_features: Vec<String>,
}

impl DscNetConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err(DscNetError::InvalidKernelSize)` for an even or zero kernel size,
    /// `Err(DscNetError::UnknownOutFeature)` for an unknown level name and
    /// `Err(DscNetError::InvalidConfiguration)` for any other inconsistency.
    pub fn validate(&self) -> DscNetResult<()> {
        check_kernel_size(self.kernel_size)?;

        if !(self.extend_scope.is_finite() && self.extend_scope > 0.0) {
            return Err(DscNetError::InvalidConfiguration {
                reason: format!(
                    "extend_scope must be a positive finite number, got {}",
                    self.extend_scope
                ),
            });
        }

        if self.embed_dim == 0 || self.embed_dim % 4 != 0 {
            return Err(DscNetError::InvalidConfiguration {
                reason: format!(
                    "embed_dim must be a positive multiple of 4, got {}",
                    self.embed_dim
                ),
            });
        }

        for channels in self.stage_channels() {
            group_norm_groups(channels)?;
        }

        self.out_levels().map(|_| ())
    }

    /// Base width of the network (`embed_dim / 4`).
    #[must_use]
    pub const fn base_channels(&self) -> usize {
        self.embed_dim / 4
    }

    /// Output channels of every stage.
    #[must_use]
    pub fn stage_channels(&self) -> [usize; NUM_STAGES] {
        STAGE_MULTIPLIERS.map(|multiplier| multiplier * self.base_channels())
    }

    /// Channel count of a pyramid level.
    #[must_use]
    pub fn level_channels(&self, level: PyramidLevel) -> usize {
        self.stage_channels()[level.stage()]
    }

    /// Parse `out_features` into pyramid levels, preserving the requested order.
    ///
    /// # Errors
    ///
    /// Fails if the request is empty, names more levels than the backbone produces,
    /// contains an unknown name or repeats a level.
    pub fn out_levels(&self) -> DscNetResult<Vec<PyramidLevel>> {
        if self.out_features.is_empty() {
            return Err(DscNetError::InvalidConfiguration {
                reason: "at least one output feature must be requested".to_string(),
            });
        }
        if self.out_features.len() > PyramidLevel::ALL.len() {
            return Err(DscNetError::InvalidConfiguration {
                reason: format!(
                    "requested {} output features but the backbone produces {} levels",
                    self.out_features.len(),
                    PyramidLevel::ALL.len()
                ),
            });
        }

        let mut levels = Vec::with_capacity(self.out_features.len());
        for name in &self.out_features {
            let level: PyramidLevel = name.parse()?;
            if levels.contains(&level) {
                return Err(DscNetError::InvalidConfiguration {
                    reason: format!("output feature {name} requested more than once"),
                });
            }
            levels.push(level);
        }
        Ok(levels)
    }

    /// Channel count and stride of every requested level, keyed by name.
    ///
    /// # Errors
    ///
    /// Same as [`DscNetConfig::out_levels`].
    pub fn output_shape(&self) -> DscNetResult<BTreeMap<String, ShapeSpec>> {
        Ok(self
            .out_levels()?
            .into_iter()
            .map(|level| {
                let spec = ShapeSpec {
                    channels: self.level_channels(level),
                    stride: level.stride(),
                };
                (level.name().to_string(), spec)
            })
            .collect())
    }
}
