use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        GroupNorm, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use super::build_group_norm;
use crate::error::DscNetResult;

/// A 3x3 convolution followed by group normalization and ReLU.
#[derive(Config, Debug)]
pub struct StandardConvConfig {
    in_channels: usize,
    out_channels: usize,
}

impl StandardConvConfig {
    /// Initializes a `StandardConv` module.
    ///
    /// # Errors
    ///
    /// Returns an error if `out_channels` cannot be split into `out_channels / 4` groups.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DscNetResult<StandardConv<B>> {
        let conv = Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let gn = build_group_norm(self.out_channels, device)?;

        Ok(StandardConv {
            conv,
            gn,
            relu: Relu::new(),
        })
    }
}

/// The plain convolution branch and the fusion projection of every stage.
#[derive(Module, Debug)]
pub struct StandardConv<B: Backend> {
    conv: Conv2d<B>,
    gn: GroupNorm<B>,
    relu: Relu,
}

impl<B: Backend> StandardConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.gn.forward(x);
        self.relu.forward(x)
    }
}
