//! # Dynamic Snake Convolution
//!
//! `DSConv` predicts an offset field, bends a line-shaped kernel along it,
//! resamples the input at the bent taps and folds the taps back with a
//! strided convolution, followed by group normalization and ReLU.

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        GroupNorm, Relu,
    },
    prelude::*,
};

use super::{
    build_group_norm, CoordinateFieldBuilder, CoordinateGrid, OffsetPredictor,
    OffsetPredictorConfig,
};
use crate::config::Morph;
use crate::error::DscNetResult;

/// Configuration for the `DSConv` module.
#[derive(Config, Debug)]
pub struct DSConvConfig {
    in_channels: usize,
    out_channels: usize,
    /// Axis along which the kernel taps are laid out.
    morph: Morph,
    #[config(default = "9")]
    kernel_size: usize,
    /// Scale of the accumulated offsets.
    #[config(default = "1.0")]
    extend_scope: f64,
    /// When false no offsets are predicted and the module is a plain
    /// `K x 1` / `1 x K` convolution with replicated borders.
    #[config(default = "true")]
    apply_offset: bool,
}

impl DSConvConfig {
    /// Initializes a new `DSConv` module.
    ///
    /// # Errors
    ///
    /// Returns an error for an even or zero kernel size, a non-positive
    /// `extend_scope` or an output width group normalization cannot split.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DscNetResult<DSConv<B>> {
        let field =
            CoordinateFieldBuilder::new(self.kernel_size, self.extend_scope, self.morph.clone())?;

        let window = self.morph.collapse_window(self.kernel_size);
        let dsc_conv = Conv2dConfig::new([self.in_channels, self.out_channels], window)
            .with_stride(window)
            .init(device);
        let gn = build_group_norm(self.out_channels, device)?;

        let offset = self
            .apply_offset
            .then(|| OffsetPredictorConfig::new(self.in_channels, self.kernel_size).init(device));

        Ok(DSConv {
            offset,
            dsc_conv,
            gn,
            relu: Relu::new(),
            field: Ignored(field),
        })
    }
}

/// Dynamic snake convolution along one axis.
#[derive(Module, Debug)]
pub struct DSConv<B: Backend> {
    offset: Option<OffsetPredictor<B>>,
    dsc_conv: Conv2d<B>,
    gn: GroupNorm<B>,
    relu: Relu,
    field: Ignored<CoordinateFieldBuilder>,
}

impl<B: Backend> DSConv<B> {
    /// # Shapes
    /// - input: `[batch, in_channels, width, height]`
    /// - output: `[batch, out_channels, width, height]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.deform(x);
        let x = self.dsc_conv.forward(x);
        let x = self.gn.forward(x);
        self.relu.forward(x)
    }

    /// Resamples the input at the snake taps.
    ///
    /// # Shapes
    /// - input: `[batch, in_channels, width, height]`
    /// - output: `[batch, in_channels, K * width, height]` along width,
    ///   `[batch, in_channels, width, K * height]` along height
    pub fn deform(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.grid(x.clone()).sample(x)
    }

    /// Sampling grid for `x`.
    pub fn grid(&self, x: Tensor<B, 4>) -> CoordinateGrid<B> {
        match &self.offset {
            Some(predictor) => self.field.build(predictor.forward(x)),
            None => {
                let [batch, _, width, height] = x.dims();
                self.field.base_grid(batch, width, height, &x.device())
            }
        }
    }

    pub fn morph(&self) -> &Morph {
        self.field.morph()
    }

    pub fn kernel_size(&self) -> usize {
        self.field.kernel_size()
    }
}
