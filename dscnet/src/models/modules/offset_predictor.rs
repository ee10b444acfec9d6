use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::tanh,
};

/// Configuration for the `OffsetPredictor` module.
#[derive(Config, Debug)]
pub struct OffsetPredictorConfig {
    in_channels: usize,
    kernel_size: usize,
}

impl OffsetPredictorConfig {
    /// Initializes an `OffsetPredictor` producing `2 * kernel_size` offset channels.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> OffsetPredictor<B> {
        let offset_channels = 2 * self.kernel_size;
        let conv = Conv2dConfig::new([self.in_channels, offset_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn = BatchNormConfig::new(offset_channels).init(device);

        OffsetPredictor { conv, bn }
    }
}

/// Predicts a per-pixel offset field bounded to `(-1, 1)`.
///
/// The first `kernel_size` channels hold the offsets of the width-oriented
/// snake, the remaining `kernel_size` those of the height-oriented one.
#[derive(Module, Debug)]
pub struct OffsetPredictor<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
}

impl<B: Backend> OffsetPredictor<B> {
    /// # Shapes
    /// - input: `[batch, in_channels, width, height]`
    /// - output: `[batch, 2 * kernel_size, width, height]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let offset = self.conv.forward(x);
        let offset = self.bn.forward(offset);
        tanh(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn offsets_are_bounded_and_keep_spatial_size() {
        let device = Default::default();
        let predictor = OffsetPredictorConfig::new(5, 3).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [2, 5, 6, 7],
            burn::tensor::Distribution::Normal(0.0, 10.0),
            &device,
        );
        let offset = predictor.forward(input);

        assert_eq!(offset.dims(), [2, 6, 6, 7]);
        let largest = offset.abs().max().into_scalar();
        assert!(largest <= 1.0, "offset magnitude {largest} escapes (-1, 1)");
    }
}
