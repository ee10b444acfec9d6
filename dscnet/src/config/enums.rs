//! Enumeration types for DSCNet configuration.
//!
//! This module contains the axis selector of the snake convolution and the
//! names of the pyramid levels the backbone can emit.

use std::{fmt, str::FromStr};

use burn::prelude::*;

use crate::error::{DscNetError, DscNetResult};

/// Selects the axis along which the kernel taps of a snake convolution are laid out.
///
/// Feature maps are indexed `[batch, channels, width, height]`.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Morph {
    /// Taps along dimension 2; the collapsing kernel is `K x 1`.
    AlongWidth,
    /// Taps along dimension 3; the collapsing kernel is `1 x K`.
    AlongHeight,
}

impl Morph {
    /// Kernel window (and stride) of the convolution that folds the
    /// expanded axis back to the input resolution.
    #[must_use]
    pub const fn collapse_window(&self, kernel_size: usize) -> [usize; 2] {
        match self {
            Self::AlongWidth => [kernel_size, 1],
            Self::AlongHeight => [1, kernel_size],
        }
    }

    /// Spatial size of the deformed feature map for a `width x height` input.
    #[must_use]
    pub const fn expanded_dims(&self, width: usize, height: usize, kernel_size: usize) -> [usize; 2] {
        match self {
            Self::AlongWidth => [width * kernel_size, height],
            Self::AlongHeight => [width, height * kernel_size],
        }
    }

    /// Index of the first channel of this morph's half of the offset field.
    #[must_use]
    pub const fn offset_channel_start(&self, kernel_size: usize) -> usize {
        match self {
            Self::AlongWidth => 0,
            Self::AlongHeight => kernel_size,
        }
    }
}

/// A named level of the feature pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PyramidLevel {
    Res2,
    Res3,
    Res4,
    Res5,
}

impl PyramidLevel {
    /// Every level, finest first.
    pub const ALL: [Self; 4] = [Self::Res2, Self::Res3, Self::Res4, Self::Res5];

    /// Backbone stage whose output forms this level.
    #[must_use]
    pub const fn stage(self) -> usize {
        match self {
            Self::Res2 => 2,
            Self::Res3 => 3,
            Self::Res4 => 4,
            Self::Res5 => 5,
        }
    }

    /// Downsampling factor relative to the input.
    #[must_use]
    pub const fn stride(self) -> usize {
        1 << self.stage()
    }

    /// Position of this level in [`PyramidLevel::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.stage() - 2
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Res2 => "res2",
            Self::Res3 => "res3",
            Self::Res4 => "res4",
            Self::Res5 => "res5",
        }
    }
}

impl fmt::Display for PyramidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PyramidLevel {
    type Err = DscNetError;

    fn from_str(name: &str) -> DscNetResult<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.name() == name)
            .ok_or_else(|| DscNetError::UnknownOutFeature {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_have_fixed_strides() {
        let strides: Vec<usize> = PyramidLevel::ALL.iter().map(|l| l.stride()).collect();
        assert_eq!(strides, vec![4, 8, 16, 32]);
    }

    #[test]
    fn level_names_parse() {
        assert_eq!("res4".parse::<PyramidLevel>().unwrap(), PyramidLevel::Res4);
        assert!(matches!(
            "res6".parse::<PyramidLevel>(),
            Err(DscNetError::UnknownOutFeature { name }) if name == "res6"
        ));
    }

    #[test]
    fn morph_windows() {
        assert_eq!(Morph::AlongWidth.collapse_window(9), [9, 1]);
        assert_eq!(Morph::AlongHeight.collapse_window(9), [1, 9]);
        assert_eq!(Morph::AlongWidth.expanded_dims(6, 7, 3), [18, 7]);
        assert_eq!(Morph::AlongHeight.expanded_dims(6, 7, 3), [6, 21]);
        assert_eq!(Morph::AlongHeight.offset_channel_start(5), 5);
    }
}
