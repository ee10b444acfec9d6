//! # Bilinear Gather Sampling
//!
//! Resamples a `[batch, channels, rows, cols]` tensor at arbitrary real-valued
//! coordinates. Corner indices are clamped independently to the valid range
//! (replicate border) while the interpolation weights are taken from the
//! unclamped fractional position, so the four weights of a point always sum to 1.

use burn::prelude::*;

/// Bilinear weights of the four integer neighbours of each sampled point.
///
/// With `r0 = floor(r)`, `r1 = r0 + 1`, `c0 = floor(c)`, `c1 = c0 + 1`:
///
/// | corner         | weight                |
/// |----------------|-----------------------|
/// | `top_left`     | `(r1 - r) * (c1 - c)` |
/// | `top_right`    | `(r1 - r) * (c - c0)` |
/// | `bottom_left`  | `(r - r0) * (c1 - c)` |
/// | `bottom_right` | `(r - r0) * (c - c0)` |
#[derive(Debug, Clone)]
pub struct CornerWeights<B: Backend, const D: usize> {
    pub top_left: Tensor<B, D>,
    pub top_right: Tensor<B, D>,
    pub bottom_left: Tensor<B, D>,
    pub bottom_right: Tensor<B, D>,
}

impl<B: Backend, const D: usize> CornerWeights<B, D> {
    /// Computes the weights for row/column coordinates of identical shape.
    pub fn new(rows: Tensor<B, D>, cols: Tensor<B, D>) -> Self {
        let row0 = rows.clone().floor();
        let row1 = row0.clone().add_scalar(1.0);
        let col0 = cols.clone().floor();
        let col1 = col0.clone().add_scalar(1.0);

        let above = row1 - rows.clone();
        let below = rows - row0;
        let left = col1 - cols.clone();
        let right = cols - col0;

        Self {
            top_left: above.clone() * left.clone(),
            top_right: above * right.clone(),
            bottom_left: below.clone() * left,
            bottom_right: below * right,
        }
    }

    /// Sum of the four weights; ones everywhere up to rounding.
    pub fn total(&self) -> Tensor<B, D> {
        self.top_left.clone()
            + self.top_right.clone()
            + self.bottom_left.clone()
            + self.bottom_right.clone()
    }
}

/// Samples `input` at the coordinates given by `rows` and `cols`.
///
/// `rows` indexes dimension 2 of `input` and `cols` dimension 3. Any real
/// coordinate is admissible; lookups outside the tensor read the nearest
/// border element.
///
/// # Shapes
/// - input: `[batch, channels, height, width]`
/// - rows, cols: `[batch, out_height, out_width]`
/// - output: `[batch, channels, out_height, out_width]`
pub fn bilinear_sample<B: Backend>(
    input: Tensor<B, 4>,
    rows: Tensor<B, 3>,
    cols: Tensor<B, 3>,
) -> Tensor<B, 4> {
    let [batch, channels, height, width] = input.dims();
    let [_, out_height, out_width] = rows.dims();
    let points = out_height * out_width;

    let rows = rows.reshape([batch, points]);
    let cols = cols.reshape([batch, points]);

    let max_row = height as i64 - 1;
    let max_col = width as i64 - 1;
    let row0 = rows.clone().floor().int();
    let col0 = cols.clone().floor().int();
    let row1 = row0.clone().add_scalar(1).clamp(0, max_row);
    let col1 = col0.clone().add_scalar(1).clamp(0, max_col);
    let row0 = row0.clamp(0, max_row);
    let col0 = col0.clamp(0, max_col);

    let weights = CornerWeights::new(rows, cols);
    let flat = input.reshape([batch, channels, height * width]);

    let corner = |row: Tensor<B, 2, Int>, col: Tensor<B, 2, Int>, weight: Tensor<B, 2>| {
        let index = (row.mul_scalar(width as i64) + col)
            .unsqueeze_dim::<3>(1)
            .expand([batch, channels, points]);
        let weight = weight
            .unsqueeze_dim::<3>(1)
            .expand([batch, channels, points]);
        flat.clone().gather(2, index) * weight
    };

    let output = corner(row0.clone(), col0.clone(), weights.top_left)
        + corner(row0, col1.clone(), weights.top_right)
        + corner(row1.clone(), col0, weights.bottom_left)
        + corner(row1, col1, weights.bottom_right);

    output.reshape([batch, channels, out_height, out_width])
}
