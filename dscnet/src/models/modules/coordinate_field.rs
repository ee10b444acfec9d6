//! # Snake Coordinate Field
//!
//! Builds the sampling grid of a dynamic snake convolution. Every input pixel
//! receives `K` taps laid out on a straight line along the morph's axis; the
//! learned offsets are accumulated outward from the center tap and bend that
//! line on the perpendicular axis, so the kernel can follow thin curved
//! structures.
//!
//! The taps of one pixel occupy `K` consecutive slots of the expanded axis
//! (slot `position * K + tap`), which lets a `K x 1` (or `1 x K`) convolution
//! with matching stride fold them back to the input resolution.

use burn::prelude::*;
use burn_extra_ops::TensorExtraOps;

use super::utils::check_kernel_size;
use crate::config::Morph;
use crate::error::{DscNetError, DscNetResult};

/// Real-valued sampling coordinates of a deformed feature map.
///
/// Both tensors have shape `[batch, expanded_width, expanded_height]`.
#[derive(Debug, Clone)]
pub struct CoordinateGrid<B: Backend> {
    /// Coordinate along the width dimension (dim 2) of the input.
    pub width: Tensor<B, 3>,
    /// Coordinate along the height dimension (dim 3) of the input.
    pub height: Tensor<B, 3>,
}

impl<B: Backend> CoordinateGrid<B> {
    pub fn dims(&self) -> [usize; 3] {
        self.width.dims()
    }

    /// Resamples `input` at the grid.
    ///
    /// # Shapes
    /// - input: `[batch, channels, width, height]`
    /// - output: `[batch, channels, expanded_width, expanded_height]`
    pub fn sample(self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        input.sample_bilinear(self.width, self.height)
    }
}

/// Turns an offset field into a [`CoordinateGrid`] for one morph.
#[derive(Debug, Clone)]
pub struct CoordinateFieldBuilder {
    kernel_size: usize,
    extend_scope: f64,
    morph: Morph,
}

impl CoordinateFieldBuilder {
    /// # Errors
    ///
    /// Returns `DscNetError::InvalidKernelSize` for an even or zero kernel size and
    /// `DscNetError::InvalidConfiguration` for a non-positive `extend_scope`.
    pub fn new(kernel_size: usize, extend_scope: f64, morph: Morph) -> DscNetResult<Self> {
        check_kernel_size(kernel_size)?;
        if !(extend_scope.is_finite() && extend_scope > 0.0) {
            return Err(DscNetError::InvalidConfiguration {
                reason: format!("extend_scope must be a positive finite number, got {extend_scope}"),
            });
        }

        Ok(Self {
            kernel_size,
            extend_scope,
            morph,
        })
    }

    pub const fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub const fn center(&self) -> usize {
        self.kernel_size / 2
    }

    pub const fn morph(&self) -> &Morph {
        &self.morph
    }

    /// Grid of the undeformed kernel: taps `-center..=center` around every pixel.
    pub fn base_grid<B: Backend>(
        &self,
        batch: usize,
        width: usize,
        height: usize,
        device: &Device<B>,
    ) -> CoordinateGrid<B> {
        let (width_coords, height_coords) = self.tap_coordinates(batch, width, height, device);
        self.interleave(width_coords, height_coords)
    }

    /// Grid bent by the accumulated offsets of this morph's half of `offset`.
    ///
    /// # Shapes
    /// - offset: `[batch, 2 * kernel_size, width, height]`
    pub fn build<B: Backend>(&self, offset: Tensor<B, 4>) -> CoordinateGrid<B> {
        let [batch, channels, width, height] = offset.dims();
        debug_assert_eq!(channels, 2 * self.kernel_size);

        let (width_coords, height_coords) =
            self.tap_coordinates::<B>(batch, width, height, &offset.device());

        let start = self.morph.offset_channel_start(self.kernel_size);
        let swing = accumulate_offsets(offset.narrow(1, start, self.kernel_size))
            .mul_scalar(self.extend_scope);

        let (width_coords, height_coords) = match self.morph {
            Morph::AlongWidth => (width_coords, height_coords + swing),
            Morph::AlongHeight => (width_coords + swing, height_coords),
        };

        self.interleave(width_coords, height_coords)
    }

    /// Per-tap coordinates, `[batch, kernel_size, width, height]` each.
    fn tap_coordinates<B: Backend>(
        &self,
        batch: usize,
        width: usize,
        height: usize,
        device: &Device<B>,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let taps_len = self.kernel_size;
        let shape = [batch, taps_len, width, height];

        let taps = Tensor::<B, 1, Int>::arange(0..taps_len as i64, device)
            .float()
            .sub_scalar(self.center() as f64)
            .reshape([1, taps_len, 1, 1])
            .expand(shape);
        let width_coords = Tensor::<B, 1, Int>::arange(0..width as i64, device)
            .float()
            .reshape([1, 1, width, 1])
            .expand(shape);
        let height_coords = Tensor::<B, 1, Int>::arange(0..height as i64, device)
            .float()
            .reshape([1, 1, 1, height])
            .expand(shape);

        match self.morph {
            Morph::AlongWidth => (width_coords + taps, height_coords),
            Morph::AlongHeight => (width_coords, height_coords + taps),
        }
    }

    /// Moves the tap dimension next to the expanded axis and merges them.
    fn interleave<B: Backend>(
        &self,
        width_coords: Tensor<B, 4>,
        height_coords: Tensor<B, 4>,
    ) -> CoordinateGrid<B> {
        let [batch, taps_len, width, height] = width_coords.dims();
        let [expanded_width, expanded_height] =
            self.morph.expanded_dims(width, height, taps_len);
        let layout = |coords: Tensor<B, 4>| {
            let coords = match self.morph {
                Morph::AlongWidth => coords.permute([0, 2, 1, 3]),
                Morph::AlongHeight => coords.permute([0, 2, 3, 1]),
            };
            coords.reshape([batch, expanded_width, expanded_height])
        };

        CoordinateGrid {
            width: layout(width_coords),
            height: layout(height_coords),
        }
    }
}

/// Accumulates raw per-tap offsets outward from the center tap.
///
/// `acc[center] = 0`, `acc[center + i] = acc[center + i - 1] + off[center + i]` and
/// `acc[center - i] = acc[center - i + 1] + off[center - i]`. The raw offset of the
/// center tap is ignored.
///
/// # Shapes
/// - offsets: `[batch, kernel_size, width, height]`, `kernel_size` odd
/// - output: `[batch, kernel_size, width, height]`
pub fn accumulate_offsets<B: Backend>(offsets: Tensor<B, 4>) -> Tensor<B, 4> {
    let [batch, taps_len, width, height] = offsets.dims();
    debug_assert_eq!(taps_len % 2, 1);
    let center = taps_len / 2;

    let zero = Tensor::<B, 4>::zeros([batch, 1, width, height], &offsets.device());
    let taps = offsets.chunk(taps_len, 1);

    let mut accumulated = Vec::with_capacity(taps_len);

    let mut running = zero.clone();
    for tap in taps[..center].iter().rev() {
        running = running + tap.clone();
        accumulated.push(running.clone());
    }
    accumulated.reverse();

    accumulated.push(zero.clone());

    let mut running = zero;
    for tap in &taps[center + 1..] {
        running = running + tap.clone();
        accumulated.push(running.clone());
    }

    Tensor::cat(accumulated, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().to_vec::<f32>().unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn center_tap_never_moves() {
        let device = Default::default();
        let offsets = Tensor::<TestBackend, 4>::random(
            [2, 7, 4, 5],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );

        let accumulated = accumulate_offsets(offsets);
        let center = accumulated.narrow(1, 3, 1).abs().max().into_scalar();

        assert_eq!(center, 0.0);
    }

    #[test]
    fn offsets_accumulate_outward() {
        let device = Default::default();
        let offsets = Tensor::<TestBackend, 1>::from_floats([0.1, 0.2, 0.3, 0.4, 0.5], &device)
            .reshape([1, 5, 1, 1]);

        let accumulated = accumulate_offsets(offsets);

        assert_close(&values(accumulated), &[0.3, 0.2, 0.0, 0.4, 0.9]);
    }

    #[test]
    fn single_tap_kernel_has_no_swing() {
        let device = Default::default();
        let offsets = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], &device);

        let accumulated = accumulate_offsets(offsets);

        assert_eq!(accumulated.dims(), [1, 1, 2, 2]);
        assert_eq!(accumulated.abs().max().into_scalar(), 0.0);
    }

    #[test]
    fn zero_offsets_give_base_taps_around_single_pixel() {
        let device = Default::default();

        let builder = CoordinateFieldBuilder::new(3, 1.0, Morph::AlongWidth).unwrap();
        let grid = builder.build(Tensor::<TestBackend, 4>::zeros([1, 6, 1, 1], &device));
        assert_eq!(grid.dims(), [1, 3, 1]);
        assert_close(&values(grid.width), &[-1.0, 0.0, 1.0]);
        assert_close(&values(grid.height), &[0.0, 0.0, 0.0]);

        let builder = CoordinateFieldBuilder::new(3, 1.0, Morph::AlongHeight).unwrap();
        let grid = builder.build(Tensor::<TestBackend, 4>::zeros([1, 6, 1, 1], &device));
        assert_eq!(grid.dims(), [1, 1, 3]);
        assert_close(&values(grid.width), &[0.0, 0.0, 0.0]);
        assert_close(&values(grid.height), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn taps_are_interleaved_pixel_major() {
        let device = Default::default();

        let builder = CoordinateFieldBuilder::new(3, 1.0, Morph::AlongWidth).unwrap();
        let grid = builder.base_grid::<TestBackend>(1, 2, 2, &device);
        assert_eq!(grid.dims(), [1, 6, 2]);
        // rows are slots of the expanded width axis, columns the height positions
        assert_close(
            &values(grid.width),
            &[-1.0, -1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
        );
        assert_close(
            &values(grid.height),
            &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        );

        let builder = CoordinateFieldBuilder::new(3, 1.0, Morph::AlongHeight).unwrap();
        let grid = builder.base_grid::<TestBackend>(1, 2, 2, &device);
        assert_eq!(grid.dims(), [1, 2, 6]);
        assert_close(
            &values(grid.width),
            &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        );
        assert_close(
            &values(grid.height),
            &[-1.0, 0.0, 1.0, 0.0, 1.0, 2.0, -1.0, 0.0, 1.0, 0.0, 1.0, 2.0],
        );
    }

    #[test]
    fn swing_bends_the_perpendicular_axis() {
        let device = Default::default();
        // Width half first, height half second.
        let offset = Tensor::<TestBackend, 1>::from_floats(
            [0.5, 0.9, -0.25, 0.1, -0.7, 0.3],
            &device,
        )
        .reshape([1, 6, 1, 1]);

        let builder = CoordinateFieldBuilder::new(3, 2.0, Morph::AlongWidth).unwrap();
        let grid = builder.build(offset.clone());
        assert_close(&values(grid.width), &[-1.0, 0.0, 1.0]);
        assert_close(&values(grid.height), &[1.0, 0.0, -0.5]);

        let builder = CoordinateFieldBuilder::new(3, 2.0, Morph::AlongHeight).unwrap();
        let grid = builder.build(offset);
        assert_close(&values(grid.width), &[0.2, 0.0, 0.6]);
        assert_close(&values(grid.height), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn swing_is_batch_independent() {
        let device = Default::default();
        let first = Tensor::<TestBackend, 4>::random(
            [1, 10, 3, 3],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let second = Tensor::<TestBackend, 4>::zeros([1, 10, 3, 3], &device);
        let builder = CoordinateFieldBuilder::new(5, 1.0, Morph::AlongHeight).unwrap();

        let batched = builder.build(Tensor::cat(vec![first.clone(), second], 0));
        let alone = builder.build(first);

        let diff = (batched.width.clone().narrow(0, 0, 1) - alone.width)
            .abs()
            .max()
            .into_scalar();
        assert_eq!(diff, 0.0);
        let base = builder.base_grid::<TestBackend>(1, 3, 3, &device);
        let diff = (batched.width.narrow(0, 1, 1) - base.width).abs().max().into_scalar();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            CoordinateFieldBuilder::new(4, 1.0, Morph::AlongWidth),
            Err(DscNetError::InvalidKernelSize { kernel_size: 4 })
        ));
        assert!(matches!(
            CoordinateFieldBuilder::new(3, 0.0, Morph::AlongWidth),
            Err(DscNetError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            CoordinateFieldBuilder::new(3, f64::NAN, Morph::AlongHeight),
            Err(DscNetError::InvalidConfiguration { .. })
        ));
    }
}
