use burn::prelude::*;

use super::{DSConv, DSConvConfig, StandardConv, StandardConvConfig};
use crate::config::Morph;
use crate::error::DscNetResult;

/// Configuration for one `TripletStage` of the backbone.
#[derive(Config, Debug)]
pub struct TripletStageConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "9")]
    kernel_size: usize,
    #[config(default = "1.0")]
    extend_scope: f64,
    #[config(default = "true")]
    apply_offset: bool,
}

impl TripletStageConfig {
    /// Initializes a new `TripletStage` module.
    ///
    /// # Errors
    ///
    /// Propagates the validation errors of the snake and standard convolutions.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DscNetResult<TripletStage<B>> {
        let snake = |morph| {
            DSConvConfig::new(self.in_channels, self.out_channels, morph)
                .with_kernel_size(self.kernel_size)
                .with_extend_scope(self.extend_scope)
                .with_apply_offset(self.apply_offset)
                .init(device)
        };

        Ok(TripletStage {
            standard: StandardConvConfig::new(self.in_channels, self.out_channels).init(device)?,
            snake_width: snake(Morph::AlongWidth)?,
            snake_height: snake(Morph::AlongHeight)?,
            fusion: StandardConvConfig::new(3 * self.out_channels, self.out_channels)
                .init(device)?,
        })
    }
}

/// A standard branch and two snake branches, concatenated and fused.
#[derive(Module, Debug)]
pub struct TripletStage<B: Backend> {
    standard: StandardConv<B>,
    snake_width: DSConv<B>,
    snake_height: DSConv<B>,
    fusion: StandardConv<B>,
}

impl<B: Backend> TripletStage<B> {
    /// # Shapes
    /// - input: `[batch, in_channels, width, height]`
    /// - output: `[batch, out_channels, width, height]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let branches = vec![
            self.standard.forward(x.clone()),
            self.snake_width.forward(x.clone()),
            self.snake_height.forward(x),
        ];
        self.fusion.forward(Tensor::cat(branches, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn stage_fuses_three_branches() {
        let device = Default::default();
        let stage = TripletStageConfig::new(3, 8)
            .with_kernel_size(3)
            .init::<TestBackend>(&device)
            .unwrap();

        let input =
            Tensor::<TestBackend, 4>::random([2, 3, 8, 6], Distribution::Normal(0.0, 1.0), &device);
        let output = stage.forward(input);

        assert_eq!(output.dims(), [2, 8, 8, 6]);
        // ReLU output
        assert!(output.min().into_scalar() >= 0.0);
    }

    #[test]
    fn stage_rejects_unsplittable_width() {
        let device = Default::default();
        let result = TripletStageConfig::new(3, 2).init::<TestBackend>(&device);

        assert!(result.is_err());
    }
}
