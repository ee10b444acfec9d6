//! # DSCNet Backbone
//!
//! This module defines the `DscNet` backbone: six triplet stages separated by 2x2 max
//! pooling. Stages 2 to 5 are exposed as the `res2`..`res5` levels of a feature pyramid.
//!
//! ## Core Components
//!
//! - `DscNet`: The backbone module. Built from a `DscNetConfig` through `DscNetConfig::init`.
//! - `FeaturePyramid`: The requested levels in requested order, addressable by name.
//! - `PyramidFeature`: One level of the pyramid with its `ShapeSpec`.

use std::collections::BTreeMap;

use burn::{
    module::Ignored,
    nn::pool::{MaxPool2d, MaxPool2dConfig},
    prelude::*,
};
use tracing::debug;

use super::modules::{TripletStage, TripletStageConfig};
use crate::{
    config::{DscNetConfig, PyramidLevel, ShapeSpec, INPUT_CHANNELS, NUM_STAGES, SIZE_DIVISIBILITY},
    error::{DscNetError, DscNetResult},
};

impl DscNetConfig {
    /// Initializes a `DscNet` backbone with this configuration.
    ///
    /// # Arguments
    ///
    /// * `device` - The device to create the model on.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DscNetResult<DscNet<B>> {
        self.validate()?;

        let mut stages = Vec::with_capacity(NUM_STAGES);
        let mut in_channels = INPUT_CHANNELS;
        for out_channels in self.stage_channels() {
            let stage = TripletStageConfig::new(in_channels, out_channels)
                .with_kernel_size(self.kernel_size)
                .with_extend_scope(self.extend_scope)
                .with_apply_offset(self.apply_offset)
                .init(device)?;
            stages.push(stage);
            in_channels = out_channels;
        }

        let levels = self
            .out_levels()?
            .into_iter()
            .map(|level| {
                let shape = ShapeSpec {
                    channels: self.level_channels(level),
                    stride: level.stride(),
                };
                (level, shape)
            })
            .collect();

        Ok(DscNet {
            stages,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            levels: Ignored(levels),
        })
    }
}

/// The DSCNet backbone.
#[derive(Module, Debug)]
pub struct DscNet<B: Backend> {
    stages: Vec<TripletStage<B>>,
    pool: MaxPool2d,
    levels: Ignored<Vec<(PyramidLevel, ShapeSpec)>>,
}

impl<B: Backend> DscNet<B> {
    /// Runs the backbone and collects the requested pyramid levels.
    ///
    /// # Shapes
    /// - input: `[batch, 3, width, height]`, both spatial sizes multiples of 32
    /// - output: level `res{s}` is `[batch, embed_dim * 2^(s - 2), width / 2^s, height / 2^s]`
    ///
    /// # Errors
    ///
    /// Returns `DscNetError::InvalidTensorShape` if the input does not have three channels
    /// or a spatial size that is not a positive multiple of [`SIZE_DIVISIBILITY`].
    pub fn forward(&self, x: Tensor<B, 4>) -> DscNetResult<FeaturePyramid<B>> {
        Self::check_input(&x.dims())?;

        // Stages past the deepest requested level are skipped.
        let last_stage = self
            .levels
            .iter()
            .map(|(level, _)| level.stage())
            .max()
            .unwrap_or(0);

        let mut collected: [Option<Tensor<B, 4>>; 4] = Default::default();
        let mut x = x;
        for (index, stage) in self.stages.iter().enumerate().take(last_stage + 1) {
            if index > 0 {
                x = self.pool.forward(x);
            }
            x = stage.forward(x);
            debug!(stage = index, shape = ?x.dims(), "dscnet stage");

            if let Some((level, _)) = self.levels.iter().find(|(level, _)| level.stage() == index)
            {
                collected[level.index()] = Some(x.clone());
            }
        }

        let mut features = Vec::with_capacity(self.levels.len());
        for (level, shape) in self.levels.iter() {
            let tensor = collected[level.index()]
                .take()
                .ok_or_else(|| DscNetError::InvalidConfiguration {
                    reason: format!("stage {} did not produce level {level}", level.stage()),
                })?;
            features.push(PyramidFeature {
                level: *level,
                shape: *shape,
                tensor,
            });
        }

        Ok(FeaturePyramid { features })
    }

    /// Channel count and stride of every requested level, keyed by name.
    pub fn output_shape(&self) -> BTreeMap<String, ShapeSpec> {
        self.levels
            .iter()
            .map(|(level, shape)| (level.name().to_string(), *shape))
            .collect()
    }

    /// Requested levels in output order.
    pub fn out_levels(&self) -> Vec<PyramidLevel> {
        self.levels.iter().map(|(level, _)| *level).collect()
    }

    /// Spatial input sizes must be a multiple of this value.
    pub const fn size_divisibility(&self) -> usize {
        SIZE_DIVISIBILITY
    }

    fn check_input(dims: &[usize; 4]) -> DscNetResult<()> {
        let [_, channels, width, height] = *dims;
        let spatial_ok = [width, height]
            .iter()
            .all(|&size| size > 0 && size % SIZE_DIVISIBILITY == 0);

        if channels != INPUT_CHANNELS || !spatial_ok {
            return Err(DscNetError::InvalidTensorShape {
                expected: format!(
                    "[batch, {INPUT_CHANNELS}, width, height] with width and height multiples of {SIZE_DIVISIBILITY}"
                ),
                actual: format!("{dims:?}"),
            });
        }
        Ok(())
    }
}

/// One level of a `FeaturePyramid`.
#[derive(Debug, Clone)]
pub struct PyramidFeature<B: Backend> {
    pub level: PyramidLevel,
    pub shape: ShapeSpec,
    pub tensor: Tensor<B, 4>,
}

impl<B: Backend> PyramidFeature<B> {
    pub const fn name(&self) -> &'static str {
        self.level.name()
    }
}

/// Output of the backbone: the requested levels in requested order.
#[derive(Debug, Clone)]
pub struct FeaturePyramid<B: Backend> {
    features: Vec<PyramidFeature<B>>,
}

impl<B: Backend> FeaturePyramid<B> {
    /// Tensor of the level called `name`, if it was requested.
    pub fn get(&self, name: &str) -> Option<&Tensor<B, 4>> {
        let level = name.parse::<PyramidLevel>().ok()?;
        self.get_level(level)
    }

    pub fn get_level(&self, level: PyramidLevel) -> Option<&Tensor<B, 4>> {
        self.features
            .iter()
            .find(|feature| feature.level == level)
            .map(|feature| &feature.tensor)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(PyramidFeature::name).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PyramidFeature<B>> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Consumes the pyramid into a name-keyed map.
    pub fn into_map(self) -> BTreeMap<String, Tensor<B, 4>> {
        self.features
            .into_iter()
            .map(|feature| (feature.name().to_string(), feature.tensor))
            .collect()
    }
}

impl<B: Backend> IntoIterator for FeaturePyramid<B> {
    type Item = PyramidFeature<B>;
    type IntoIter = std::vec::IntoIter<PyramidFeature<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn small_config() -> DscNetConfig {
        DscNetConfig::new().with_embed_dim(16).with_kernel_size(3)
    }

    #[test]
    fn res2_of_default_backbone() {
        let device = Default::default();
        let model = DscNetConfig::new()
            .with_out_features(vec!["res2".to_string()])
            .init::<TestBackend>(&device)
            .unwrap();

        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 64, 64], Distribution::Default, &device);
        let pyramid = model.forward(input).unwrap();

        assert_eq!(pyramid.len(), 1);
        assert_eq!(pyramid.get("res2").unwrap().dims(), [1, 96, 16, 16]);
    }

    #[test]
    fn all_levels_have_expected_shapes() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();

        let input =
            Tensor::<TestBackend, 4>::random([2, 3, 64, 96], Distribution::Default, &device);
        let pyramid = model.forward(input).unwrap();

        assert_eq!(pyramid.names(), vec!["res2", "res3", "res4", "res5"]);
        for feature in pyramid.iter() {
            let stride = feature.shape.stride;
            assert_eq!(
                feature.tensor.dims(),
                [2, feature.shape.channels, 64 / stride, 96 / stride],
                "{}",
                feature.name()
            );
        }

        let shapes = model.output_shape();
        assert_eq!(shapes["res2"], ShapeSpec { channels: 16, stride: 4 });
        assert_eq!(shapes["res3"], ShapeSpec { channels: 32, stride: 8 });
        assert_eq!(shapes["res4"], ShapeSpec { channels: 64, stride: 16 });
        assert_eq!(shapes["res5"], ShapeSpec { channels: 128, stride: 32 });
    }

    #[test]
    fn levels_follow_requested_order() {
        let device = Default::default();
        let model = small_config()
            .with_out_features(vec!["res4".to_string(), "res2".to_string()])
            .init::<TestBackend>(&device)
            .unwrap();

        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 32, 32], Distribution::Default, &device);
        let pyramid = model.forward(input).unwrap();

        assert_eq!(pyramid.names(), vec!["res4", "res2"]);
        assert_eq!(pyramid.get("res4").unwrap().dims(), [1, 64, 2, 2]);
        assert!(pyramid.get("res3").is_none());
        assert!(pyramid.get("res9").is_none());

        let map = pyramid.into_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["res2"].dims(), [1, 16, 8, 8]);
    }

    #[test]
    fn disabled_offsets_keep_shapes() {
        let device = Default::default();
        let model = small_config()
            .with_apply_offset(false)
            .init::<TestBackend>(&device)
            .unwrap();

        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 32, 64], Distribution::Default, &device);
        let pyramid = model.forward(input).unwrap();

        assert_eq!(pyramid.get("res5").unwrap().dims(), [1, 128, 1, 2]);
    }

    #[test]
    fn rejects_invalid_input() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device).unwrap();
        assert_eq!(model.size_divisibility(), 32);

        for dims in [[1, 3, 48, 64], [1, 3, 64, 0], [1, 1, 64, 64]] {
            let input = Tensor::<TestBackend, 4>::zeros(dims, &device);
            assert!(matches!(
                model.forward(input),
                Err(DscNetError::InvalidTensorShape { .. })
            ));
        }
    }

    #[test]
    fn invalid_config_fails_to_build() {
        let device = Default::default();
        let result = small_config()
            .with_out_features(vec!["res1".to_string()])
            .init::<TestBackend>(&device);

        assert!(matches!(result, Err(DscNetError::UnknownOutFeature { .. })));
    }
}
